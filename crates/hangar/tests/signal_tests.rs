//! Process-level shutdown test: the built binary must exit cleanly on SIGTERM.

#![cfg(unix)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(10);

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn spawn_hangar(port: u16) -> Child {
    Command::new(env!("CARGO_BIN_EXE_hangar"))
        .args(["--env-file", "/nonexistent/hangar/.env"])
        .env_clear()
        .env("HOST", "127.0.0.1")
        .env("PORT", port.to_string())
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

/// Forward every output line of `reader` into `tx`.
fn forward_lines(reader: impl Read + Send + 'static, tx: mpsc::Sender<String>) {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

fn health_ok(port: u16) -> bool {
    let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)) else {
        return false;
    };
    let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));
    if stream.write_all(b"GET /health HTTP/1.0\r\nHost: localhost\r\n\r\n").is_err() {
        return false;
    }
    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    response.starts_with("HTTP/1.0 200") || response.starts_with("HTTP/1.1 200")
}

#[test]
fn test_sigterm_exits_cleanly() {
    let port = free_port();
    let mut child = spawn_hangar(port);

    let (tx, rx) = mpsc::channel();
    forward_lines(child.stdout.take().unwrap(), tx.clone());
    forward_lines(child.stderr.take().unwrap(), tx);

    let started = Instant::now();
    while !health_ok(port) {
        assert!(started.elapsed() < TIMEOUT, "server never became ready");
        assert!(child.try_wait().unwrap().is_none(), "server exited before serving");
        thread::sleep(Duration::from_millis(50));
    }

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let stopped = Instant::now();
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if stopped.elapsed() > TIMEOUT {
            let _ = child.kill();
            panic!("server did not exit after SIGTERM");
        }
        thread::sleep(Duration::from_millis(50));
    };
    assert_eq!(exit.code(), Some(0));

    let mut output = Vec::new();
    while let Ok(line) = rx.recv_timeout(Duration::from_secs(1)) {
        output.push(line);
    }
    let output = output.join("\n");
    assert!(output.contains("Received shutdown signal"), "output: {output}");
    assert!(output.contains("shutting down"), "output: {output}");
    assert!(output.contains("Hangar server stopped"), "output: {output}");
}
