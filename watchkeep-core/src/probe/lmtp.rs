use crate::error::{ControlError, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// Longest reply line accepted, terminator included.
const MAX_LINE: usize = 512;

async fn say<S>(stream: &mut BufReader<S>, msg: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let inner = stream.get_mut();
    inner
        .write_all(msg.as_bytes())
        .await
        .map_err(|e| ControlError::Probe(format!("LMTP: error sending data -- {e}")))?;
    inner
        .flush()
        .await
        .map_err(|e| ControlError::Probe(format!("LMTP: error sending data -- {e}")))
}

/// Leading decimal number of a reply line, if any.
fn reply_code(line: &str) -> Option<i32> {
    let trimmed = line.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed[..end].parse().ok()
}

async fn expect<S>(stream: &mut BufReader<S>, code: i32) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let read = (&mut *stream)
            .take(MAX_LINE as u64)
            .read_line(&mut line)
            .await
            .map_err(|e| ControlError::Probe(format!("LMTP: error receiving data -- {e}")))?;
        if read == 0 {
            return Err(ControlError::Probe(
                "LMTP: error receiving data -- connection closed".into(),
            ));
        }
        if read == MAX_LINE && !line.ends_with('\n') {
            return Err(ControlError::Probe(
                "LMTP: error receiving data -- reply line too long".into(),
            ));
        }
        let chomped = line.trim_end_matches(['\r', '\n']);
        if chomped.as_bytes().get(3) != Some(&b'-') {
            break;
        }
    }
    let reply = line.trim_end_matches(['\r', '\n']);
    debug!(reply, "lmtp reply");
    match reply_code(reply) {
        Some(got) if got == code => Ok(()),
        _ => Err(ControlError::Probe(format!("LMTP error: {reply}"))),
    }
}

/// Greeting 220, `LHLO` answered by 250, `QUIT` answered by 221.
pub async fn check_lmtp<S>(stream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    expect(&mut stream, 220).await?;
    say(&mut stream, "LHLO localhost\r\n").await?;
    expect(&mut stream, 250).await?;
    say(&mut stream, "QUIT\r\n").await?;
    expect(&mut stream, 221).await
}

/// Connects to `addr` and runs [`check_lmtp`]; `timeout` covers the whole exchange.
#[instrument]
pub async fn probe_lmtp(addr: SocketAddr, timeout: Duration) -> Result<()> {
    let exchange = async {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ControlError::Probe(format!("LMTP: cannot connect -- {e}")))?;
        check_lmtp(stream).await
    };
    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| ControlError::Probe(format!("LMTP: timed out after {timeout:?}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};
    use tokio::net::TcpListener;

    async fn scripted_server<S>(mut peer: S, replies: &'static [&'static str]) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut received = String::new();
        let mut buf = [0u8; 256];
        for (i, reply) in replies.iter().enumerate() {
            if i > 0 {
                let n = peer.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.push_str(std::str::from_utf8(&buf[..n]).unwrap());
            }
            peer.write_all(reply.as_bytes()).await.unwrap();
        }
        received
    }

    #[tokio::test]
    async fn healthy_server_passes() {
        let (client, server) = duplex(1024);
        let script = tokio::spawn(scripted_server(
            server,
            &[
                "220 mail.example.org LMTP ready\r\n",
                "250-mail.example.org\r\n250-PIPELINING\r\n250 ENHANCEDSTATUSCODES\r\n",
                "221 bye\r\n",
            ],
        ));
        check_lmtp(client).await.unwrap();
        let sent = script.await.unwrap();
        assert_eq!(sent, "LHLO localhost\r\nQUIT\r\n");
    }

    #[tokio::test]
    async fn wrong_greeting_fails_with_reply_text() {
        let (client, server) = duplex(1024);
        tokio::spawn(scripted_server(server, &["554 go away\r\n"]));
        let err = check_lmtp(client).await.unwrap_err();
        assert_eq!(err.to_string(), "LMTP error: 554 go away");
    }

    #[tokio::test]
    async fn rejected_lhlo_fails() {
        let (client, server) = duplex(1024);
        tokio::spawn(scripted_server(
            server,
            &["220 ready\r\n", "500 unknown command\r\n"],
        ));
        let err = check_lmtp(client).await.unwrap_err();
        assert_eq!(err.to_string(), "LMTP error: 500 unknown command");
    }

    #[tokio::test]
    async fn closed_connection_is_a_receive_error() {
        let (client, server) = duplex(64);
        drop(server);
        let err = check_lmtp(client).await.unwrap_err();
        assert!(err.to_string().starts_with("LMTP: error receiving data"));
    }

    #[tokio::test]
    async fn unterminated_reply_is_cut_off() {
        let (client, mut server) = duplex(4096);
        server.write_all(&[b'2'; 2000]).await.unwrap();
        let err = check_lmtp(client).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "LMTP: error receiving data -- reply line too long"
        );
        drop(server);
    }

    #[test]
    fn reply_codes() {
        assert_eq!(reply_code("250 ok"), Some(250));
        assert_eq!(reply_code("  221"), Some(221));
        assert_eq!(reply_code("garbage"), None);
    }

    #[tokio::test]
    async fn tcp_probe_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            scripted_server(socket, &["220 hi\r\n", "250 hello\r\n", "221 bye\r\n"]).await;
        });
        probe_lmtp(addr, Duration::from_secs(2)).await.unwrap();
    }
}
