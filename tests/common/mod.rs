#![allow(dead_code)]

pub mod test_server {
    use std::net::SocketAddr;
    use std::sync::{Arc, Once};
    use wax_server::dispatcher::Dispatcher;
    use wax_server::ids::NodeId;
    use wax_server::runtime_config::RuntimeConfig;
    use wax_server::server::{HttpServer, ServerHandle};
    use wax_server::store::Repository;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x10000);
        });
    }

    /// Server on an ephemeral loopback port, stopped on drop.
    pub struct WaxTestServer {
        handle: Option<ServerHandle>,
        addr: SocketAddr,
        dispatcher: Arc<Dispatcher>,
    }

    impl WaxTestServer {
        pub fn new() -> Self {
            setup_may_runtime();
            let repository = Arc::new(Repository::with_node_id(NodeId::from_string("test")));
            let dispatcher = Arc::new(Dispatcher::new(repository));
            let handle = HttpServer::new(Arc::clone(&dispatcher), RuntimeConfig::default())
                .start("127.0.0.1:0")
                .unwrap();
            handle.wait_ready().unwrap();
            let addr = handle.local_addr();
            Self {
                handle: Some(handle),
                addr,
                dispatcher,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }

        pub fn dispatcher(&self) -> &Arc<Dispatcher> {
            &self.dispatcher
        }

        /// Wait for the server to exit on its own (after `/quit`).
        pub fn join(mut self) {
            if let Some(handle) = self.handle.take() {
                handle.join().unwrap();
            }
        }
    }

    impl Drop for WaxTestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

pub mod http {
    use serde_json::Value;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Parsed HTTP response.
    #[derive(Debug, Clone)]
    pub struct TestResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl TestResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap_or(Value::Null)
        }
    }

    /// Write `raw` on a fresh connection and read until the server closes it.
    pub fn send_request(addr: &SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(raw).unwrap();
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Build a `Connection: close` request with an optional JSON body.
    pub fn build_request(method: &str, path: &str, body: Option<&Value>) -> String {
        match body {
            Some(body) => {
                let text = body.to_string();
                format!(
                    "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
                     Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{text}",
                    text.len()
                )
            }
            None => format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
        }
    }

    pub fn request(addr: &SocketAddr, method: &str, path: &str, body: Option<&Value>) -> TestResponse {
        let raw = send_request(addr, build_request(method, path, body).as_bytes());
        parse_response(&raw)
    }

    pub fn parse_response(resp: &str) -> TestResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        TestResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    /// Read exactly one response from a kept-alive connection.
    pub fn read_response<R: BufRead>(reader: &mut R) -> TestResponse {
        let mut head = String::new();
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).unwrap();
            assert!(n > 0, "connection closed before response head");
            if line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }
        let mut response = parse_response(head.trim_end());
        let length: usize = response
            .header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).unwrap();
        response.body = String::from_utf8(body).unwrap();
        response
    }

    /// Persistent client connection for keep-alive tests.
    pub struct Connection {
        reader: BufReader<TcpStream>,
    }

    impl Connection {
        pub fn open(addr: &SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            Self {
                reader: BufReader::new(stream),
            }
        }

        pub fn send(&mut self, raw: &[u8]) -> TestResponse {
            self.write(raw);
            self.read()
        }

        /// Write without waiting for a response.
        pub fn write(&mut self, raw: &[u8]) {
            let stream = self.reader.get_mut();
            stream.write_all(raw).unwrap();
            stream.flush().unwrap();
        }

        pub fn read(&mut self) -> TestResponse {
            read_response(&mut self.reader)
        }

        /// True when the server has closed its side.
        pub fn is_closed(&mut self) -> bool {
            let mut buf = [0u8; 1];
            matches!(self.reader.read(&mut buf), Ok(0))
        }
    }
}
