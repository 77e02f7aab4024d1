use std::thread;
use std::time::Duration;

use thiserror::Error;

const ERROR_BODY_PREVIEW_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub attempts: usize,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: HTTP status {status}{}", preview_suffix(.body))]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error(
        "request to {url} failed after {attempts} attempt(s): HTTP status {status}{}",
        preview_suffix(.body)
    )]
    StatusExhausted {
        url: String,
        status: u16,
        body: String,
        attempts: usize,
    },
    #[error("request to {url} failed after {attempts} attempt(s): transport error: {message}")]
    Transport {
        url: String,
        message: String,
        attempts: usize,
    },
    #[error("request to {url} failed: response decode failed: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } | FetchError::StatusExhausted { status, .. } => {
                Some(*status)
            }
            FetchError::Transport { .. } | FetchError::Decode { .. } => None,
        }
    }
}

fn preview_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

fn body_preview(response: ureq::Response) -> String {
    let body = response.into_string().ok().unwrap_or_default();
    body.trim()
        .chars()
        .take(ERROR_BODY_PREVIEW_CHARS)
        .collect::<String>()
}

/// GETs `url` and returns the body. Retryable statuses and transport errors are
/// retried until `policy.attempts` is spent; everything else fails on the first try.
pub fn get_text_with_retries(
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    let mut attempt = 1;
    loop {
        let mut request = agent.get(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        log::debug!("GET {url} (attempt {attempt}/{attempts})");

        match request.call() {
            Ok(response) => {
                return response.into_string().map_err(|source| FetchError::Decode {
                    url: url.to_string(),
                    source,
                });
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = body_preview(response);
                if !should_retry_http_status(status) {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                        body,
                    });
                }
                if attempt >= attempts {
                    return Err(FetchError::StatusExhausted {
                        url: url.to_string(),
                        status,
                        body,
                        attempts,
                    });
                }
                log::warn!(
                    "GET {url} returned HTTP {status}; retrying in {:?}",
                    policy.retry_delay
                );
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt >= attempts {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        message: err.to_string(),
                        attempts,
                    });
                }
                log::warn!(
                    "GET {url} transport error: {err}; retrying in {:?}",
                    policy.retry_delay
                );
            }
        }

        thread::sleep(policy.retry_delay);
        attempt += 1;
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub(crate) enum Behavior {
        Respond(u16, String),
        DelayRespond(Duration, u16, String),
    }

    /// Scripted HTTP/1.1 server on an ephemeral port. Unscripted requests get a 404.
    #[derive(Debug)]
    pub(crate) struct TestServer {
        pub(crate) base_url: String,
        request_lines: Arc<Mutex<Vec<String>>>,
        shutdown_tx: mpsc::Sender<()>,
        join_handle: Option<std::thread::JoinHandle<()>>,
    }

    impl TestServer {
        pub(crate) fn spawn(behaviors: Vec<Behavior>) -> Self {
            let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
            listener.set_nonblocking(true).expect("set nonblocking");
            let addr = listener.local_addr().expect("local addr");

            let request_lines = Arc::new(Mutex::new(Vec::new()));
            let lines_clone = Arc::clone(&request_lines);
            let queue = Arc::new(Mutex::new(VecDeque::from(behaviors)));
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

            let join_handle = std::thread::spawn(move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                    match listener.accept() {
                        Ok((mut stream, _)) => {
                            let _ = stream.set_nonblocking(false);
                            let line = read_request_line(&mut stream).unwrap_or_default();
                            lines_clone.lock().expect("lock request lines").push(line);
                            let behavior = queue
                                .lock()
                                .expect("lock behaviors")
                                .pop_front()
                                .unwrap_or_else(|| Behavior::Respond(404, String::new()));
                            std::thread::spawn(move || serve(&mut stream, behavior));
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            std::thread::sleep(Duration::from_millis(5));
                        }
                        Err(_) => break,
                    }
                }
            });

            Self {
                base_url: format!("http://{addr}"),
                request_lines,
                shutdown_tx,
                join_handle: Some(join_handle),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.request_lines.lock().expect("lock request lines").len()
        }

        /// First line of every request received, e.g. `GET /episodes?_limit=2 HTTP/1.1`.
        pub(crate) fn request_lines(&self) -> Vec<String> {
            self.request_lines.lock().expect("lock request lines").clone()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            let _ = self.shutdown_tx.send(());
            if let Some(handle) = self.join_handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn read_request_line(stream: &mut TcpStream) -> std::io::Result<String> {
        stream.set_read_timeout(Some(Duration::from_millis(200)))?;
        let mut buf = [0_u8; 1024];
        let mut data = Vec::new();
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => {
                    data.extend_from_slice(&buf[..read]);
                    if data.windows(4).any(|window| window == b"\r\n\r\n") {
                        break;
                    }
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        let text = String::from_utf8_lossy(&data);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    fn serve(stream: &mut TcpStream, behavior: Behavior) {
        let (status, body) = match behavior {
            Behavior::Respond(status, body) => (status, body),
            Behavior::DelayRespond(delay, status, body) => {
                std::thread::sleep(delay);
                (status, body)
            }
        };
        let reason = match status {
            200 => "OK",
            404 => "Not Found",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Status",
        };
        let _ = write!(
            stream,
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.flush();
    }
}
