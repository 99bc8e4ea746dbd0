//! Local JSON-RPC endpoint for tests: answers `eth_call` from a table keyed by
//! the calldata selector and rejects everything else.

use alloy::primitives::Bytes;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

pub(crate) type CallTable = HashMap<[u8; 4], Bytes>;

/// Starts the endpoint and returns its URL.
pub(crate) async fn serve(calls: CallTable) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let calls = Arc::new(calls);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(connection(socket, calls.clone()));
        }
    });
    url
}

async fn connection(socket: TcpStream, calls: Arc<CallTable>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    loop {
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }
        let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let reply = answer(&request, &calls).to_string();
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
            reply.len()
        );
        if write.write_all(head.as_bytes()).await.is_err()
            || write.write_all(reply.as_bytes()).await.is_err()
        {
            return;
        }
    }
}

fn answer(request: &Value, calls: &CallTable) -> Value {
    let id = request["id"].clone();
    let tx = &request["params"][0];
    let input = tx["input"].as_str().or_else(|| tx["data"].as_str()).unwrap_or("");
    let selector = hex::decode(input.trim_start_matches("0x"))
        .ok()
        .and_then(|data| <[u8; 4]>::try_from(data.get(..4)?).ok());

    match (request["method"].as_str(), selector.and_then(|s| calls.get(&s))) {
        (Some("eth_call"), Some(output)) => {
            json!({ "jsonrpc": "2.0", "id": id, "result": output.to_string() })
        }
        (method, _) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": format!("execution reverted: no answer for {:?}", method) }
        }),
    }
}
