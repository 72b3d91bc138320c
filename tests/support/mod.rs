// One arena server per test binary, shared by every test in it.
use std::{
    net::SocketAddr,
    sync::{OnceLock, mpsc},
    time::Duration,
};

static SERVER_URL: OnceLock<String> = OnceLock::new();

// Boot the server on first use and return its base URL (`http://host:port`).
pub fn ensure_server() -> &'static str {
    SERVER_URL.get_or_init(|| {
        let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();

        // A dedicated OS thread and runtime so the server outlives each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Ephemeral port avoids collisions with a locally running arena.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                addr_tx.send(addr).expect("publish bound address");

                duel_arena::run(listener).await.expect("server failed");
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server should publish its address");
        wait_until_accepting(addr);
        format!("http://{addr}")
    })
}

fn wait_until_accepting(addr: SocketAddr) {
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
