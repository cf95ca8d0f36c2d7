use anyhow::Result;
use session_keepalive::config::{parse_duration, Config, InjectionKind, InputChannel};
use session_keepalive::platform::mock::{MockSessionKeyboard, MockWindowBackend, MockWindowTree};
use session_keepalive::platform::{Point, Rect, WindowHandle, WindowMessage};
use session_keepalive::{
    window_locator, InputInjector, KeepAliveError, Phase, ProcessFinder, ProcessHandle,
    ProcessSession, Scheduler, TickAction, VirtualKey,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const MAIN: WindowHandle = WindowHandle(0x1000);
const SESSION: WindowHandle = WindowHandle(0x2000);

fn rdp_desktop() -> MockWindowTree {
    MockWindowTree::new()
        .with_main_window(3100, MAIN)
        .with_child(MAIN, WindowHandle(0x1100), "UIMainClass")
        .with_child(WindowHandle(0x1100), WindowHandle(0x1200), "OPContainerClass")
        .with_child(WindowHandle(0x1100), SESSION, "IHWindowClass")
}

fn client() -> ProcessHandle {
    ProcessHandle::new(3100, "mstsc.exe")
}

#[test]
fn test_full_config() {
    let json = r#"
    {
        "process_name": "wfica32.exe",
        "window_class": "Transparent Windows Client",
        "action": "click",
        "key": "f15",
        "interval": "30s",
        "max_retries": 20,
        "retry_delay": "500ms",
        "toggle_hotkey": "ctrl+alt+k",
        "verbose": true
    }
    "#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.process_name, "wfica32.exe");
    assert_eq!(config.window_class, "Transparent Windows Client");
    assert_eq!(config.action, InjectionKind::Click);
    assert_eq!(config.virtual_key().unwrap(), VirtualKey(0x7E));
    assert_eq!(config.interval, Duration::from_secs(30));
    assert_eq!(config.max_retries, 20);
    assert_eq!(config.retry_delay, Duration::from_millis(500));
    assert_eq!(config.toggle_hotkey.as_deref(), Some("ctrl+alt+k"));
    assert!(config.verbose);

    assert!(config.validate().is_ok());
}

#[test]
fn test_default_values() {
    let config: Config = serde_json::from_str("{}").unwrap();

    assert_eq!(config.process_name, "mstsc.exe");
    assert_eq!(config.window_class, "IHWindowClass");
    assert_eq!(config.action, InjectionKind::Key);
    assert_eq!(config.key, "a");
    assert_eq!(config.interval, Duration::from_secs(1));
    assert_eq!(config.max_retries, 10);
    assert_eq!(config.retry_delay, Duration::from_secs(1));
    assert!(config.toggle_hotkey.is_none());
    assert!(!config.verbose);

    assert!(config.validate().is_ok());
}

#[test]
fn test_config_file_operations() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(br#"{ "process_name": "msrdc.exe", "interval": "5s" }"#)?;

    let config = Config::from_file(temp_file.path().to_str().unwrap())?;

    assert_eq!(config.process_name, "msrdc.exe");
    assert_eq!(config.interval, Duration::from_secs(5));
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_config_save_load_roundtrip() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("keepalive.json");
    let path = path.to_str().unwrap();

    let saved = Config {
        action: InjectionKind::Click,
        interval: Duration::from_millis(1500),
        toggle_hotkey: Some("shift+F9".to_string()),
        ..Config::default()
    };

    saved.save_to_file(path)?;
    let loaded = Config::from_file(path)?;

    assert_eq!(loaded, saved);
    Ok(())
}

#[test]
fn test_session_channel_config() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let ica = temp_dir.path().join("desktop.ica");
    std::fs::write(&ica, "[WFClient]")?;

    let json = format!(
        r#"{{ "process_name": "wfica32.exe", "channel": "session", "connection_file": {:?} }}"#,
        ica.to_str().unwrap()
    );
    let config: Config = serde_json::from_str(&json)?;

    assert_eq!(config.channel, InputChannel::Session);
    assert_eq!(config.connection_file.as_deref(), ica.to_str());
    assert!(config.validate().is_ok());

    std::fs::remove_file(&ica)?;
    assert!(matches!(
        config.validate(),
        Err(KeepAliveError::ConfigurationInvalid(_))
    ));
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let err = Config::from_file("/definitely/not/here/keepalive.json").unwrap_err();
    assert!(matches!(err, KeepAliveError::ConfigLoad { .. }));
}

#[test]
fn test_malformed_config_rejected() {
    assert!(serde_json::from_str::<Config>(r#"{ "interval": "soon" }"#).is_err());
    assert!(serde_json::from_str::<Config>(r#"{ "action": "scroll" }"#).is_err());
}

#[test]
fn test_duration_parsing_edge_cases() {
    assert_eq!(parse_duration("0ms").unwrap(), Duration::from_millis(0));
    assert_eq!(parse_duration("1000").unwrap(), Duration::from_millis(1000));
    assert_eq!(parse_duration("5S").unwrap(), Duration::from_secs(5));
    assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("abc").is_err());
    assert!(parse_duration("1000x").is_err());
    assert!(parse_duration("-1000ms").is_err());
}

#[test]
fn test_config_validation_errors() {
    let mut config = Config {
        process_name: "".to_string(),
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(KeepAliveError::ConfigurationInvalid(_))
    ));

    config.process_name = "mstsc.exe".to_string();
    config.window_class = "  ".to_string();
    assert!(config.validate().is_err());

    config.window_class = "IHWindowClass".to_string();
    config.key = "hyper".to_string();
    assert!(config.validate().is_err());

    config.key = "a".to_string();
    config.max_retries = 0;
    assert!(config.validate().is_err());

    config.max_retries = 3;
    config.toggle_hotkey = Some("ctrl+alt+notakey".to_string());
    assert!(config.validate().is_err());

    config.toggle_hotkey = None;
    assert!(config.validate().is_ok());
}

#[test]
fn test_process_finder_nonexistent_process() {
    let mut finder = ProcessFinder::new();
    assert!(finder.find_process("nonexistent_process_xyz_123456").is_none());
}

#[test]
fn test_locator_finds_session_window() {
    let target = window_locator::locate(&rdp_desktop(), &client(), "IHWindowClass").unwrap();
    assert_eq!(target.handle(), SESSION);
}

#[test]
fn test_locator_missing_class_is_fatal() {
    let err = window_locator::locate(&rdp_desktop(), &client(), "TscShellContainerClass")
        .unwrap_err();
    assert!(matches!(err, KeepAliveError::TargetNotFound { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_click_scenario_hits_center() {
    let backend = Arc::new(
        MockWindowBackend::new()
            .with_cursor(Point { x: 1500, y: 20 })
            .with_rect(
                SESSION,
                Rect {
                    left: 100,
                    top: 100,
                    right: 300,
                    bottom: 300,
                },
            ),
    );
    let target = window_locator::locate(&rdp_desktop(), &client(), "IHWindowClass").unwrap();

    InputInjector::window(target, backend.clone())
        .inject(TickAction::Click)
        .unwrap();

    let moves = backend.cursor_moves.lock().unwrap().clone();
    assert_eq!(moves, vec![Point { x: 200, y: 200 }, Point { x: 1500, y: 20 }]);
    assert_eq!(backend.cursor(), Point { x: 1500, y: 20 });
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_key_taps_while_running() {
    let backend = Arc::new(MockWindowBackend::new());
    let target = window_locator::locate(&rdp_desktop(), &client(), "IHWindowClass").unwrap();
    let scheduler = Scheduler::spawn(
        InputInjector::window(target, backend.clone()),
        TickAction::KeyTap(VirtualKey::A),
        Duration::from_secs(2),
    );

    assert_eq!(scheduler.toggle().phase, Phase::Running);
    tokio::time::sleep(Duration::from_millis(7000)).await;
    assert_eq!(scheduler.toggle().phase, Phase::Idle);

    let posted = backend.posted();
    assert_eq!(posted.len(), 6);
    assert!(posted.iter().all(|m| m.window == SESSION));
    assert!(posted
        .chunks(2)
        .all(|pair| pair[0].message == WindowMessage::KeyDown
            && pair[1].message == WindowMessage::KeyUp));

    let state = scheduler.terminate().await;
    assert_eq!(state.phase, Phase::Stopped);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.posted().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_session_keyboard_channel() {
    let tree = Arc::new(rdp_desktop());
    let keyboard = Arc::new(MockSessionKeyboard::new());
    let backend = Arc::new(MockWindowBackend::new());
    let session = ProcessSession::new(tree.clone(), "mstsc.exe", 1, Duration::from_secs(1))
        .with_keyboard(keyboard.clone());

    let injector = InputInjector::for_session(
        &session,
        tree.as_ref(),
        backend.clone(),
        &client(),
        "IHWindowClass",
    )
    .unwrap();
    let scheduler = Scheduler::spawn(injector, TickAction::KeyTap(VirtualKey::A), Duration::from_secs(1));

    scheduler.toggle();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.terminate().await;

    assert_eq!(
        keyboard.events(),
        vec![
            (VirtualKey::A, true),
            (VirtualKey::A, false),
            (VirtualKey::A, true),
            (VirtualKey::A, false),
        ]
    );
    assert!(backend.posted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_resume_waits_full_interval() {
    let backend = Arc::new(MockWindowBackend::new());
    let target = window_locator::locate(&rdp_desktop(), &client(), "IHWindowClass").unwrap();
    let scheduler = Scheduler::spawn(
        InputInjector::window(target, backend.clone()),
        TickAction::KeyTap(VirtualKey::A),
        Duration::from_secs(1),
    );

    scheduler.toggle();
    tokio::time::sleep(Duration::from_millis(900)).await;
    scheduler.toggle();
    scheduler.toggle();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(backend.posted().is_empty());

    tokio::time::sleep(Duration::from_millis(850)).await;
    assert_eq!(backend.posted().len(), 2);
    scheduler.terminate().await;
}

#[tokio::test(start_paused = true)]
async fn test_interval_retune_scenario() {
    let backend = Arc::new(MockWindowBackend::new());
    let target = window_locator::locate(&rdp_desktop(), &client(), "IHWindowClass").unwrap();
    let scheduler = Scheduler::spawn(
        InputInjector::window(target, backend),
        TickAction::KeyTap(VirtualKey::A),
        Duration::from_millis(1000),
    );

    for _ in 0..3 {
        scheduler.increase_interval();
    }
    assert_eq!(scheduler.state().interval.as_millis(), 4000);

    for _ in 0..100 {
        scheduler.increase_interval();
    }
    assert_eq!(scheduler.state().interval.as_millis(), 60_000);
    assert_eq!(scheduler.state().phase, Phase::Idle);

    scheduler.terminate().await;
}

#[test]
fn test_error_types() {
    let err = KeepAliveError::process_not_found("mstsc.exe", 10);
    assert!(err.to_string().contains("mstsc.exe"));
    assert!(err.to_string().contains("10"));

    let err = KeepAliveError::invalid_key("hyper", "unknown key name");
    assert!(err.to_string().contains("hyper"));

    let err = KeepAliveError::configuration_invalid("missing field");
    assert!(err.to_string().contains("missing field"));
}
