use super::*;
use crate::status::Status;
use crate::test_helpers::{CLOSE_COMMAND, spawn_chat_server, spawn_echo_server, unused_url};
use tokio::io::AsyncWriteExt;
use crate::view::PanelSet;
use std::time::Duration;

const FAST_POLL: Duration = Duration::from_millis(50);

fn fast_config(base_url: &str) -> ViewerConfig {
    let mut config = ViewerConfig::with_base_url(base_url).expect("test base url is valid");
    config.poll_interval = FAST_POLL;
    config
}

async fn wait_for_view(viewer: &Viewer, want: &ViewState) {
    let mut rx = viewer.subscribe_statuses();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| select_view(s) == *want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want:?}"))
        .expect("poller stopped");
}

fn panels(endpoints: &[Endpoint]) -> ViewState {
    ViewState::Panels(endpoints.iter().copied().collect::<PanelSet>())
}

#[tokio::test]
async fn mount_starts_in_loading() {
    let server = spawn_echo_server(&["/chat", "/goal", "/map"]).await;
    let viewer = Viewer::mount(fast_config(&server.base_url));

    assert_eq!(viewer.statuses(), Statuses::waiting());
    assert_eq!(viewer.view(), ViewState::Loading);
    assert!(viewer.render().contains("Connecting..."));

    viewer.unmount().await;
}

#[tokio::test]
async fn reachable_endpoints_become_tabs() {
    let server = spawn_echo_server(&["/chat", "/goal"]).await;
    let mut viewer = Viewer::mount(fast_config(&server.base_url));

    wait_for_view(&viewer, &panels(&[Endpoint::Chat, Endpoint::Goal])).await;
    viewer.refresh();

    assert_eq!(viewer.statuses().map, Status::Disconnected);
    assert_eq!(viewer.active_tab(), Some(Endpoint::Chat));
    let out = viewer.render();
    assert!(out.contains("[*Robot Chat*] [ Goal Viewer ]"));
    assert!(!out.contains("Map Viewer"));

    viewer.unmount().await;
}

#[tokio::test]
async fn unreachable_backend_shows_failure_with_base_url() {
    let base = unused_url("").await;
    let viewer = Viewer::mount(fast_config(&base));

    wait_for_view(&viewer, &ViewState::Failed).await;
    let out = viewer.render();
    assert!(out.contains("Connection Failed!"));
    assert!(out.contains(&base));

    viewer.unmount().await;
}

#[tokio::test]
async fn select_tab_only_among_visible() {
    let server = spawn_echo_server(&["/chat", "/goal"]).await;
    let mut viewer = Viewer::mount(fast_config(&server.base_url));
    wait_for_view(&viewer, &panels(&[Endpoint::Chat, Endpoint::Goal])).await;

    let outcome = viewer.handle_command(Command::SelectTab(Endpoint::Map)).unwrap();
    assert_eq!(outcome, Outcome::Notice("Map Viewer is not connected".into()));

    let outcome = viewer.handle_command(Command::SelectTab(Endpoint::Goal)).unwrap();
    assert_eq!(outcome, Outcome::Redraw);
    assert_eq!(viewer.active_tab(), Some(Endpoint::Goal));
    assert!(viewer.render().contains("Goal Viewer streaming from"));

    viewer.unmount().await;
}

#[tokio::test]
async fn say_goes_through_chat_session() {
    let server = spawn_echo_server(&["/chat"]).await;
    let mut viewer = Viewer::mount(fast_config(&server.base_url));
    let mut inbound = viewer.subscribe_chat();
    wait_for_view(&viewer, &panels(&[Endpoint::Chat])).await;

    let outcome = viewer.handle_command(Command::Say("hello".into())).unwrap();
    assert_eq!(outcome, Outcome::Notice("no conversation focused; message sent".into()));

    let echoed = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .expect("echo timed out")
        .expect("chat session closed");
    let value: serde_json::Value = serde_json::from_str(&echoed.text).unwrap();
    assert_eq!(value["username"], "evan");
    assert_eq!(value["message"], "hello");

    viewer.ingest(&echoed);
    assert!(viewer.render().contains("last received: "));

    viewer.unmount().await;
}

#[tokio::test]
async fn say_without_chat_is_a_notice() {
    let server = spawn_echo_server(&["/goal"]).await;
    let mut viewer = Viewer::mount(fast_config(&server.base_url));
    wait_for_view(&viewer, &panels(&[Endpoint::Goal])).await;

    let outcome = viewer.handle_command(Command::Say("hello".into())).unwrap();
    assert_eq!(outcome, Outcome::Notice("chat is not connected".into()));

    viewer.unmount().await;
}

#[tokio::test]
async fn username_and_focus_commands() {
    let server = spawn_echo_server(&["/chat"]).await;
    let mut viewer = Viewer::mount(fast_config(&server.base_url));

    assert_eq!(viewer.handle_command(Command::SetUsername("ada".into())).unwrap(), Outcome::Redraw);
    assert_eq!(viewer.chat().username(), "ada");
    assert_eq!(
        viewer.handle_command(Command::Focus("shafer".into())).unwrap(),
        Outcome::Notice("no conversation with shafer".into())
    );

    viewer.ingest(&InboundMessage { seq: 1, text: r#"{"sender":"shafer","message":"hi"}"#.into() });
    assert_eq!(viewer.handle_command(Command::Focus("shafer".into())).unwrap(), Outcome::Redraw);
    assert_eq!(viewer.handle_command(Command::Quit).unwrap(), Outcome::Quit);

    viewer.unmount().await;
}

#[tokio::test]
async fn unmount_stops_status_updates() {
    let server = spawn_echo_server(&["/chat", "/goal", "/map"]).await;
    let viewer = Viewer::mount(fast_config(&server.base_url));
    let mut rx = viewer.subscribe_statuses();
    wait_for_view(&viewer, &panels(&Endpoint::ALL)).await;

    viewer.unmount().await;
    rx.mark_unchanged();
    tokio::time::sleep(FAST_POLL * 4).await;

    assert!(rx.has_changed().is_err(), "poller should be gone");
}

// =============================================================
// Run loop
// =============================================================

#[tokio::test]
async fn run_redraws_on_status_change_until_shutdown() {
    let server = spawn_echo_server(&["/chat", "/map"]).await;
    let viewer = Viewer::mount(fast_config(&server.base_url));
    let mut out = Vec::new();

    viewer
        .run(&b""[..], &mut out, tokio::time::sleep(Duration::from_millis(1500)))
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Connecting..."));
    assert!(text.contains("[*Robot Chat*] [ Map Viewer ]"));
}

#[tokio::test]
async fn run_stops_on_quit_and_reports_bad_commands() {
    let server = spawn_echo_server(&["/chat"]).await;
    let viewer = Viewer::mount(fast_config(&server.base_url));
    let mut out = Vec::new();

    viewer
        .run(&b"/dance\n/quit\n"[..], &mut out, std::future::pending())
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("! unknown command `/dance`"));
}

#[tokio::test]
async fn say_into_focused_chat_records_the_line() {
    let server = spawn_chat_server(r#"{"sender":"shafer","message":"standing by"}"#).await;
    let mut viewer = Viewer::mount(fast_config(&server.base_url));
    wait_for_view(&viewer, &panels(&[Endpoint::Chat])).await;

    viewer.ingest(&InboundMessage { seq: 1, text: r#"{"sender":"shafer","message":"standing by"}"#.into() });
    let outcome = viewer.handle_command(Command::Say("come here".into())).unwrap();
    assert_eq!(outcome, Outcome::Redraw);
    assert!(viewer.render().contains("> evan: come here"));

    viewer.unmount().await;
}

#[tokio::test]
async fn run_shows_chat_pushed_on_the_session() {
    let server = spawn_chat_server(r#"{"sender":"shafer","message":"standing by"}"#).await;
    let viewer = Viewer::mount(fast_config(&server.base_url));
    let mut out = Vec::new();

    viewer
        .run(&b""[..], &mut out, tokio::time::sleep(Duration::from_millis(1500)))
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("  * shafer  standing by"));
    assert!(text.contains("--- shafer ---"));
    assert!(text.contains("< shafer: standing by"));
}

#[tokio::test]
async fn run_redraws_when_chat_session_closes() {
    let server = spawn_chat_server(r#"{"sender":"shafer","message":"standing by"}"#).await;
    let viewer = Viewer::mount(fast_config(&server.base_url));
    let mut statuses = viewer.subscribe_statuses();
    let (input, mut feed) = tokio::io::duplex(256);
    tokio::spawn(async move {
        if statuses.wait_for(|s| s.chat == Status::Connected).await.is_ok() {
            let _ = feed.write_all(format!("{CLOSE_COMMAND}\n").as_bytes()).await;
        }
    });
    let mut out = Vec::new();

    viewer
        .run(tokio::io::BufReader::new(input), &mut out, tokio::time::sleep(Duration::from_millis(2000)))
        .await
        .unwrap();

    // Statuses stay the same after the session drops; only its own state
    // change can produce this frame.
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("session: closed"), "no redraw after session closed:\n{text}");
}
