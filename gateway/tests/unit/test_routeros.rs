//! RouterOS API client against a scripted device on a local socket

use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use routergate::errors::GatewayError;
use routergate::executor::Param;
use routergate::registry::DeviceEndpoint;
use routergate::routeros::codec::{encode_length, read_sentence, write_sentence};
use routergate::routeros::RouterOsConnector;
use routergate::session::DeviceConnector;

const USER: &str = "api";
const PASSWORD: &str = "api-pass";

/// Serve one connection, recording the first word of every sentence received
async fn serve_device(mut stream: TcpStream, seen: Arc<Mutex<Vec<String>>>) {
    loop {
        let Ok(sentence) = read_sentence(&mut stream).await else {
            return;
        };
        let command = sentence.first().cloned().unwrap_or_default();
        seen.lock().unwrap().push(command.clone());

        let replies: Vec<Vec<String>> = match command.as_str() {
            "/login" => {
                let name = format!("=name={USER}");
                let password = format!("=password={PASSWORD}");
                if sentence.contains(&name) && sentence.contains(&password) {
                    vec![vec!["!done".into()]]
                } else {
                    vec![
                        vec![
                            "!trap".into(),
                            "=message=invalid user name or password (6)".into(),
                        ],
                        vec!["!done".into()],
                    ]
                }
            }
            "/ip/address/print" => vec![
                vec![
                    "!re".into(),
                    "=.id=*1".into(),
                    "=address=192.168.88.1/24".into(),
                    "=interface=bridge1".into(),
                ],
                vec!["!re".into(), "=.id=*2".into(), "=address=10.0.0.1/8".into()],
                vec!["!done".into()],
            ],
            "/ip/address/add" => vec![
                vec![
                    "!trap".into(),
                    "=message=failure: already have such address".into(),
                ],
                vec!["!done".into()],
            ],
            "/interface/print" => {
                // Raw codepage bytes, as a device sends a comment typed on its console.
                if stream.write_all(&latin_record()).await.is_err() {
                    return;
                }
                continue;
            }
            "/interface/vlan/add" => vec![vec!["!done".into(), "=ret=*5".into()]],
            "/queue/simple/print" => vec![vec!["!empty".into()], vec!["!done".into()]],
            "/quit" => {
                let _ = write_sentence(&mut stream, &["!fatal", "session terminated on request"])
                    .await;
                return;
            }
            _ => vec![vec!["!fatal".into(), "unknown command".into()]],
        };

        for reply in replies {
            if write_sentence(&mut stream, &reply).await.is_err() {
                return;
            }
        }
    }
}

/// `!re =.id=*1 =comment=caf<0xE9>` then `!done`, byte for byte
fn latin_record() -> Vec<u8> {
    let mut out = Vec::new();
    for word in [&b"!re"[..], &b"=.id=*1"[..], &b"=comment=caf\xE9"[..]] {
        encode_length(word.len(), &mut out).unwrap();
        out.extend_from_slice(word);
    }
    out.push(0);
    encode_length(5, &mut out).unwrap();
    out.extend_from_slice(b"!done");
    out.push(0);
    out
}

async fn start_device() -> (u16, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorded = seen.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_device(stream, recorded.clone()));
        }
    });

    (port, seen)
}

fn endpoint(port: u16, password: &str) -> DeviceEndpoint {
    DeviceEndpoint {
        id: "local".to_string(),
        host: "127.0.0.1".to_string(),
        username: USER.to_string(),
        secret: SecretString::from(password),
        port,
    }
}

#[tokio::test]
async fn test_login_print_and_close() {
    let (port, seen) = start_device().await;
    let mut session = RouterOsConnector
        .connect(&endpoint(port, PASSWORD))
        .await
        .unwrap();

    let records = session.send("/ip/address/print", &[]).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0][".id"], "*1");
    assert_eq!(records[0]["interface"], "bridge1");
    assert_eq!(records[1]["address"], "10.0.0.1/8");

    let records = session.send("/queue/simple/print", &[]).await.unwrap();
    assert!(records.is_empty());

    session.close().await.unwrap();
    session.close().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["/login", "/ip/address/print", "/queue/simple/print", "/quit"]
    );
}

#[tokio::test]
async fn test_trap_is_a_device_error_and_session_stays_usable() {
    let (port, _seen) = start_device().await;
    let mut session = RouterOsConnector
        .connect(&endpoint(port, PASSWORD))
        .await
        .unwrap();

    let params = [
        Param::new("address", "192.168.88.1/24"),
        Param::new("interface", "bridge1"),
    ];
    let err = session.send("/ip/address/add", &params).await.unwrap_err();
    match err {
        GatewayError::DeviceError(message) => {
            assert_eq!(message, "failure: already have such address")
        }
        other => panic!("unexpected {other:?}"),
    }

    let records = session.send("/ip/address/print", &[]).await.unwrap();
    assert_eq!(records.len(), 2);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_done_attributes_become_a_record() {
    let (port, _seen) = start_device().await;
    let mut session = RouterOsConnector
        .connect(&endpoint(port, PASSWORD))
        .await
        .unwrap();

    let records = session.send("/interface/vlan/add", &[]).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["ret"], "*5");
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_non_utf8_device_text_is_decoded() {
    let (port, _seen) = start_device().await;
    let mut session = RouterOsConnector
        .connect(&endpoint(port, PASSWORD))
        .await
        .unwrap();

    let records = session.send("/interface/print", &[]).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0][".id"], "*1");
    assert_eq!(records[0]["comment"], "café");

    // The session is still in sync afterwards.
    let records = session.send("/ip/address/print", &[]).await.unwrap();
    assert_eq!(records.len(), 2);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_fatal_marks_session_closed() {
    let (port, _seen) = start_device().await;
    let mut session = RouterOsConnector
        .connect(&endpoint(port, PASSWORD))
        .await
        .unwrap();

    let err = session.send("/system/script/run", &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::TransportError(_)));

    let err = session.send("/ip/address/print", &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::TransportError(_)));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_rejected_login_is_a_connect_failure() {
    let (port, _seen) = start_device().await;

    let err = RouterOsConnector
        .connect(&endpoint(port, "wrong"))
        .await
        .err()
        .unwrap();

    match err {
        GatewayError::ConnectFailure { target, cause } => {
            assert_eq!(target, format!("127.0.0.1:{port}"));
            assert!(cause.contains("invalid user name or password"), "{cause}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_connection_is_a_connect_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = RouterOsConnector
        .connect(&endpoint(port, PASSWORD))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GatewayError::ConnectFailure { .. }));
}
