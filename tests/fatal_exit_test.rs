//! Process-level behaviour of the `kaho` binary.

use std::net::TcpListener;
use std::process::Command;

const STORE_FLAGS: [&str; 3] = [
    "NATSUKI_KAHO_BROADCAST",
    "NATSUKI_KAHO_STORE",
    "NATSUKI_KAHO_BUFFER",
];

fn kaho() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_kaho"));
    for name in STORE_FLAGS {
        command.env_remove(name);
    }
    command.env_remove("RUST_LOG");
    command.env("NATSUKI_KAHO_PRINT", "1").env("RUST_LOG_FORMAT", "text");
    command
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn unsupported_proxy_mode_exits_non_zero() {
    let output = kaho()
        .env("NATSUKI_PROXY", "bogus")
        .env("HTTP_PORT", free_port().to_string())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Unsupported Proxy Mode"),
        "fatal entry should be printed before exit: {stdout}"
    );
}

#[test]
fn invalid_http_port_exits_non_zero() {
    let output = kaho()
        .env("NATSUKI_PROXY", "none")
        .env("HTTP_PORT", "not-a-port")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn healthcheck_subcommand_fails_without_server() {
    let output = kaho()
        .arg("healthcheck")
        .env("HTTP_PORT", free_port().to_string())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}
