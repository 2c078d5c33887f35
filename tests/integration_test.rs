//! Integration tests for the full terminal flow.

use bt_terminal::bluetooth::stub::{device, StubDiscovery, StubPairing, StubTransport};
use bt_terminal::bluetooth::SPP_UUID;
use bt_terminal::catalog::DeviceCatalog;
use bt_terminal::commands::Interpreter;
use bt_terminal::session::Session;
use bt_terminal::terminal::TerminalLoop;

struct Stack {
    discovery: StubDiscovery,
    pairing: StubPairing,
    transport: StubTransport,
}

impl Stack {
    fn new(devices: Vec<bt_terminal::bluetooth::Device>) -> Self {
        Self {
            discovery: StubDiscovery::new(devices),
            pairing: StubPairing::new(),
            transport: StubTransport::new(),
        }
    }

    async fn run(&self, script: &str) -> (anyhow::Result<()>, String) {
        let interpreter = Interpreter::new(
            DeviceCatalog::new(Box::new(self.discovery.clone())),
            Session::new(
                Box::new(self.pairing.clone()),
                Box::new(self.transport.clone()),
                SPP_UUID,
            ),
        );
        let mut output = Vec::new();
        let result = TerminalLoop::new(script.as_bytes(), &mut output, interpreter)
            .run()
            .await;
        (result, String::from_utf8(output).unwrap())
    }
}

#[tokio::test]
async fn test_authenticated_device_flow() {
    let device_a = device(0x0A, "DeviceA", false);
    let device_b = device(0x0B, "DeviceB", true);
    let stack = Stack::new(vec![device_a, device_b.clone()]);

    let (result, output) = stack
        .run("select DeviceB\nconnect\nmsg hello world\nquit\n")
        .await;

    result.unwrap();
    assert!(stack.pairing.calls().is_empty());
    assert_eq!(stack.transport.connects(), vec![(device_b.address, SPP_UUID)]);
    assert_eq!(stack.transport.written(), b"hello world\r\n\r\n");
    assert_eq!(stack.transport.flushes(), 1);

    assert!(output.contains(">> Selected DeviceB\n"));
    assert!(output.contains("(DeviceB)>> Connecting to DeviceB...\nConnected\n"));
    assert!(output.contains("$(DeviceB)>> $(DeviceB)>> Bye!\n"));
    assert_eq!(stack.transport.shutdowns(), 1);
}

#[tokio::test]
async fn test_unpaired_device_is_paired_before_connecting() {
    let device_a = device(0x0A, "DeviceA", false);
    let stack = Stack::new(vec![device_a.clone()]);

    let (result, _) = stack.run("s DeviceA\nc 4321\nmsg one\nmsg two\nq\n").await;

    result.unwrap();
    assert_eq!(
        stack.pairing.calls(),
        vec![(device_a.address, Some("4321".to_string()))]
    );
    assert_eq!(stack.transport.written(), b"one\r\n\r\ntwo\r\n\r\n");
    assert_eq!(stack.transport.flushes(), 2);
}

#[tokio::test]
async fn test_user_errors_do_not_end_the_session() {
    let stack = Stack::new(vec![device(0x0A, "DeviceA", false)]);

    let (result, output) = stack
        .run("foo\nselect\nselect Nope\nmsg hi\nconnect\nrefresh\nlist\nquit\n")
        .await;

    result.unwrap();
    assert!(output.contains("Missing argument: name\n"));
    assert!(output.contains("Device 'Nope' not found\n"));
    assert_eq!(output.matches("No device selected\n").count(), 2);
    assert!(output.contains("Refreshing devices...\nDone!\n"));
    assert!(output.ends_with(">> DeviceA\n>> Bye!\n"));
    assert_eq!(stack.discovery.scans(), 2);
    assert!(stack.transport.connects().is_empty());
}

#[tokio::test]
async fn test_end_of_input_fails() {
    let stack = Stack::new(vec![]);

    let (result, output) = stack.run("list\n").await;

    assert!(result.is_err());
    assert!(output.contains("No devices\n"));
}
