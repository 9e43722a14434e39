//! Integration tests for the WebSocket connector.
//!
//! These tests spin up a real WebSocket server with `tokio-tungstenite`
//! and dial it through [`WsConnector`] to verify that frames actually
//! flow over the network in both directions.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    use forgelink_transport::{Connection, Connector, TransportError, WsConnector};

    /// Helper: binds an in-test WebSocket echo server on a random port and
    /// returns its address. The server echoes data frames back verbatim.
    async fn start_echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream)
                        .await
                        .expect("handshake should succeed");
                    while let Some(Ok(msg)) = ws.next().await {
                        match msg {
                            Message::Binary(_) | Message::Text(_) => {
                                if ws.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_connect_and_round_trip() {
        let addr = start_echo_server().await;
        let conn = WsConnector
            .connect(&addr)
            .await
            .expect("connect should succeed");

        assert!(conn.id().into_inner() > 0);

        conn.send(b"hello lobby").await.expect("send should succeed");
        let echoed = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(echoed, b"hello lobby");

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_explicit_scheme_is_respected() {
        let addr = start_echo_server().await;
        let conn = WsConnector
            .connect(&format!("ws://{addr}"))
            .await
            .expect("connect should succeed");
        conn.send(b"ping").await.unwrap();
        assert_eq!(conn.recv().await.unwrap().unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_text_frames_surface_as_bytes() {
        // Server that greets with a text frame as the lobby protocol does.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text("{\"command\":\"pong\",\"args\":[]}".into()))
                .await
                .unwrap();
        });

        let conn = WsConnector.connect(&addr).await.unwrap();
        let frame = conn.recv().await.unwrap().unwrap();
        assert_eq!(frame, b"{\"command\":\"pong\",\"args\":[]}");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let conn = WsConnector.connect(&addr).await.unwrap();
        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_connect_to_dead_address_fails() {
        // Bind then drop a listener so the port is known to be dead.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match WsConnector.connect(&addr).await {
            Err(TransportError::ConnectFailed(_)) => {}
            Err(other) => panic!("expected ConnectFailed, got {other:?}"),
            Ok(_) => panic!("expected ConnectFailed, got a connection"),
        }
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let addr = start_echo_server().await;
        let first = WsConnector.connect(&addr).await.unwrap();
        let second = WsConnector.connect(&addr).await.unwrap();
        assert_ne!(first.id(), second.id());
    }
}
