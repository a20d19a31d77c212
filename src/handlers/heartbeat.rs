//! `PING`/`PONG` keepalive (spec §6.2). Synchronous and stateless — no
//! engine or session lookup needed.

use crate::router::ServerMessage;

pub fn ping(request_id: Option<String>) -> Vec<ServerMessage> {
    vec![ServerMessage::Pong { request_id }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_with_no_request_id_still_pongs() {
        let out = ping(None);
        assert!(matches!(out.as_slice(), [ServerMessage::Pong { request_id: None }]));
    }
}
