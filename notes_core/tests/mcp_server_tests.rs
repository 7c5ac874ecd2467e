mod common;

use common::{connector, sample_store, FakeNotesApp, SampleStore};
use notes_core::mcp_server::{JsonRpcHandler, McpServer};
use notes_core::transport::StdioTransport;
use serde_json::{json, Value};
use std::sync::Arc;

fn handler(store: &SampleStore) -> JsonRpcHandler {
    let connector = connector(Arc::new(FakeNotesApp::default()), store.fixture.index());
    JsonRpcHandler::new(McpServer::new(Arc::new(connector)))
}

fn initialize_request(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }
    })
}

#[tokio::test]
async fn test_initialize() {
    let store = sample_store();
    let response = handler(&store)
        .handle_request(initialize_request(1))
        .await
        .unwrap();

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["serverInfo"]["name"], "apple-notes");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(response["result"]["protocolVersion"].is_string());
}

#[tokio::test]
async fn test_ping_and_empty_listings() {
    let store = sample_store();
    let handler = handler(&store);

    let pong = handler
        .handle_request(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}))
        .await
        .unwrap();
    assert_eq!(pong["result"], json!({}));

    let resources = handler
        .handle_request(json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}))
        .await
        .unwrap();
    assert_eq!(resources["result"]["resources"], json!([]));

    let prompts = handler
        .handle_request(json!({"jsonrpc": "2.0", "id": 4, "method": "prompts/list", "params": {}}))
        .await
        .unwrap();
    assert_eq!(prompts["result"]["prompts"], json!([]));
}

#[tokio::test]
async fn test_tools_list() {
    let store = sample_store();
    let response = handler(&store)
        .handle_request(json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}))
        .await
        .unwrap();

    assert_eq!(response["id"], "a");
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 4);
    assert_eq!(tools[3]["name"], "create_note");
    assert_eq!(tools[3]["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn test_tools_call() {
    let store = sample_store();
    let response = handler(&store)
        .handle_request(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "search_notes", "arguments": {"query": "#work"}}
        }))
        .await
        .unwrap();

    let result = &response["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["structuredContent"]["search_type"], "tag");
    assert_eq!(result["structuredContent"]["found_count"], 2);
    assert_eq!(result["content"][0]["type"], "text");
}

#[tokio::test]
async fn test_protocol_errors() {
    let store = sample_store();
    let handler = handler(&store);

    let unknown_method = handler
        .handle_request(json!({"jsonrpc": "2.0", "id": 1, "method": "notes/delete"}))
        .await
        .unwrap();
    assert_eq!(unknown_method["error"]["code"], -32601);

    let unknown_tool = handler
        .handle_request(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "delete_note", "arguments": {}}
        }))
        .await
        .unwrap();
    assert_eq!(unknown_tool["error"]["code"], -32602);

    let bad_args = handler
        .handle_request(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "create_note", "arguments": {"body": "no title"}}
        }))
        .await
        .unwrap();
    assert_eq!(bad_args["error"]["code"], -32602);

    let bad_params = handler
        .handle_request(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {}}))
        .await
        .unwrap();
    assert_eq!(bad_params["error"]["code"], -32602);
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let store = sample_store();
    let response = handler(&store)
        .handle_request(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_stdio_transport_round_trip() {
    let store = sample_store();
    let transport = StdioTransport::new(handler(&store));

    let input = format!(
        "{}\n{}\n\nnot json\n{}\n",
        initialize_request(1),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "list_notes", "arguments": {"limit": 1}}
        })
    );
    let mut output = Vec::new();
    transport
        .run_with(input.as_bytes(), &mut output)
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert_eq!(lines[1]["id"], Value::Null);
    assert_eq!(lines[2]["id"], 2);
    assert_eq!(
        lines[2]["result"]["structuredContent"]["notes"][0]["title"],
        "Groceries"
    );
}

#[tokio::test]
async fn test_stdio_transport_survives_invalid_utf8() {
    let store = sample_store();
    let transport = StdioTransport::new(handler(&store));

    let mut input = vec![0xff, 0xfe, b'\n'];
    input.extend_from_slice(json!({"jsonrpc": "2.0", "id": 7, "method": "ping"}).to_string().as_bytes());
    input.push(b'\n');
    let mut output = Vec::new();
    transport
        .run_with(input.as_slice(), &mut output)
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["error"]["code"], -32700);
    assert_eq!(lines[0]["error"]["message"], "Parse error");
    assert_eq!(lines[0]["id"], Value::Null);
    assert_eq!(lines[1]["id"], 7);
    assert!(lines[1].get("error").is_none());
}
