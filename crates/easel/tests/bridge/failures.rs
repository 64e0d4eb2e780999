use anyhow::Result;
use async_trait::async_trait;
use easel::{
    BoxError, BridgeBuilder, EntryPoint, Error, EventSource, HostEvent, PhysicalKey, QueuedEvents,
};

use super::common::{PROBE, TestHost, bootstrap, idle_guest};

const LOG_IMPORT: &str = r#"(import "env" "log" (func $log (param i32 i32)))"#;

/// Logs `len` bytes at `ptr` on every tick.
fn logging_guest(ptr: i64, len: i64) -> String {
    format!(
        r#"
(module
  {LOG_IMPORT}
  (memory (export "memory") 1)
  (func (export "main"))
  (func (export "tick") (call $log (i32.const {ptr}) (i32.const {len})))
  (func (export "key_down") (param i32))
  (func (export "key_up") (param i32)))
"#
    )
}

#[tokio::test]
async fn unknown_import_fails_bootstrap() -> Result<()> {
    let guest = idle_guest(
        r#"(import "env" "fetch" (func $fetch))"#,
        r#"(func (export "main"))"#,
    );
    let Err(err) = bootstrap(&guest, 8, 8).await else {
        panic!("expected bootstrap to reject the import");
    };

    assert!(
        matches!(&err, Error::UnknownImport { module, name } if module == "env" && name == "fetch"),
        "unexpected error: {err}"
    );
    Ok(())
}

#[tokio::test]
async fn foreign_import_module_fails_bootstrap() -> Result<()> {
    let guest = idle_guest(
        r#"(import "wasi_snapshot_preview1" "log" (func $log (param i32 i32)))"#,
        r#"(func (export "main"))"#,
    );
    let Err(err) = bootstrap(&guest, 8, 8).await else {
        panic!("expected bootstrap to reject the import");
    };

    assert!(matches!(err, Error::UnknownImport { .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn malformed_module_fails_to_compile() -> Result<()> {
    let Err(err) = BridgeBuilder::new()
        .build(b"\0asm\x01\0\0\0garbage".as_slice(), TestHost::new(8, 8))
        .await
    else {
        panic!("expected compile failure");
    };

    assert!(matches!(err, Error::Compile(_)), "{err}");
    Ok(())
}

#[tokio::test]
async fn missing_exports_fail_bootstrap() -> Result<()> {
    let no_tick = format!(
        r#"
(module
  {LOG_IMPORT}
  (memory (export "memory") 1)
  (func (export "main"))
  (func (export "key_down") (param i32))
  (func (export "key_up") (param i32)))
"#
    );
    let Err(err) = bootstrap(&no_tick, 8, 8).await else {
        panic!("expected missing tick");
    };
    assert!(matches!(err, Error::MissingExport("tick")), "{err}");

    let no_entry = idle_guest("", "");
    let Err(err) = bootstrap(&no_entry, 8, 8).await else {
        panic!("expected missing entry point");
    };
    assert!(matches!(err, Error::MissingExport("main")), "{err}");
    Ok(())
}

#[tokio::test]
async fn mistyped_export_fails_bootstrap() -> Result<()> {
    let guest = r#"
(module
  (memory (export "memory") 1)
  (func (export "main"))
  (func (export "tick"))
  (func (export "key_down"))
  (func (export "key_up") (param i32)))
"#;
    let Err(err) = bootstrap(guest, 8, 8).await else {
        panic!("expected signature mismatch");
    };

    assert!(
        matches!(err, Error::ExportSignature { name: "key_down", .. }),
        "{err}"
    );
    Ok(())
}

#[tokio::test]
async fn failing_main_fails_bootstrap() -> Result<()> {
    let guest = idle_guest("", r#"(func (export "main") unreachable)"#);
    let Err(err) = bootstrap(&guest, 8, 8).await else {
        panic!("expected main to trap");
    };

    assert!(matches!(err, Error::Guest { entry: "main", .. }), "{err}");
    assert!(err.capability_cause().is_none());
    Ok(())
}

#[tokio::test]
async fn out_of_bounds_log_halts_frame_loop() -> Result<()> {
    let mut bridge = bootstrap(&logging_guest(65_530, 100), 8, 8).await?;
    let mut events: QueuedEvents = [HostEvent::Refresh, HostEvent::Refresh]
        .into_iter()
        .collect();

    let err = bridge
        .run(&mut events)
        .await
        .expect_err("out-of-bounds log must fail");

    assert!(matches!(err, Error::Guest { entry: "tick", .. }), "{err}");
    assert!(
        matches!(
            err.capability_cause(),
            Some(Error::MemoryBounds {
                ptr: 65_530,
                len: 100,
                size: 65_536
            })
        ),
        "{err:?}"
    );
    assert_eq!(events.len(), 1, "the loop must stop at the failing tick");
    assert!(bridge.host().frames.is_empty());
    assert!(bridge.host().logs.is_empty());
    assert_eq!(bridge.halted(), Some(EntryPoint::Tick));
    assert!(matches!(bridge.tick(), Err(Error::Halted("tick"))));
    Ok(())
}

#[tokio::test]
async fn wrapping_log_span_is_rejected() -> Result<()> {
    let mut bridge = bootstrap(&logging_guest(-1, 2), 8, 8).await?;

    let err = bridge.tick().expect_err("span past u32::MAX must fail");

    assert!(
        matches!(
            err.capability_cause(),
            Some(Error::MemoryBounds {
                ptr: u32::MAX,
                len: 2,
                ..
            })
        ),
        "{err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn log_without_exported_memory_fails() -> Result<()> {
    let guest = format!(
        r#"
(module
  {LOG_IMPORT}
  (memory 1)
  (func (export "main") (call $log (i32.const 0) (i32.const 1)))
  (func (export "tick"))
  (func (export "key_down") (param i32))
  (func (export "key_up") (param i32)))
"#
    );
    let Err(err) = bootstrap(&guest, 8, 8).await else {
        panic!("expected log to fail without memory");
    };

    assert!(
        matches!(err.capability_cause(), Some(Error::MissingExport("memory"))),
        "{err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn trapping_key_handler_halts_bridge() -> Result<()> {
    let guest = r#"
(module
  (memory (export "memory") 1)
  (func (export "main"))
  (func (export "tick"))
  (func (export "key_down") (param i32) unreachable)
  (func (export "key_up") (param i32)))
"#;
    let mut bridge = bootstrap(guest, 8, 8).await?;

    let err = bridge
        .key_down(&PhysicalKey::from("KeyQ"))
        .expect_err("key_down traps");

    assert!(matches!(err, Error::Guest { entry: "key_down", .. }), "{err}");
    assert!(err.capability_cause().is_none());
    assert!(matches!(
        bridge.dispatch(HostEvent::Refresh),
        Err(Error::Halted("key_down"))
    ));
    Ok(())
}

#[tokio::test]
async fn capability_in_start_function_is_not_ready() -> Result<()> {
    let guest = idle_guest(
        r#"(import "env" "surface_width" (func $width (result i32)))"#,
        r#"(func $start (drop (call $width)))
  (start $start)
  (func (export "main"))"#,
    );
    let Err(err) = bootstrap(&guest, 8, 8).await else {
        panic!("expected start function to fail");
    };

    assert!(matches!(err, Error::Instantiate(_)), "{err}");
    assert!(
        matches!(
            err.capability_cause(),
            Some(Error::NotReady("surface_width"))
        ),
        "{err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn memory_growth_beyond_cap_is_refused() -> Result<()> {
    // Traps only if growing by 2 MiB succeeds.
    let guest = idle_guest(
        "",
        r#"(func (export "main")
    (if (i32.ne (memory.grow (i32.const 32)) (i32.const -1)) (then unreachable)))"#,
    );

    BridgeBuilder::new()
        .max_memory(1024 * 1024)
        .build(guest.as_str(), TestHost::new(8, 8))
        .await?;

    let Err(err) = BridgeBuilder::new()
        .build(guest.as_str(), TestHost::new(8, 8))
        .await
    else {
        panic!("growth within the default cap should succeed and trap");
    };
    assert!(matches!(err, Error::Guest { entry: "main", .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn initial_memory_beyond_cap_fails_instantiation() -> Result<()> {
    let guest = r#"
(module
  (memory (export "memory") 32)
  (func (export "main"))
  (func (export "tick"))
  (func (export "key_down") (param i32))
  (func (export "key_up") (param i32)))
"#;
    let Err(err) = BridgeBuilder::new()
        .max_memory(1024 * 1024)
        .build(guest, TestHost::new(8, 8))
        .await
    else {
        panic!("expected instantiation to fail");
    };

    assert!(matches!(err, Error::Instantiate(_)), "{err}");
    Ok(())
}

#[tokio::test]
async fn present_failure_is_fatal() -> Result<()> {
    let mut host = TestHost::new(8, 8);
    host.fail_present = true;
    let mut bridge = BridgeBuilder::new().build(PROBE, host).await?;

    let err = bridge
        .run(&mut QueuedEvents::from_iter([HostEvent::Refresh]))
        .await
        .expect_err("present fails");

    assert!(matches!(err, Error::Host(_)), "{err}");
    Ok(())
}

struct BrokenSource;

#[async_trait]
impl EventSource for BrokenSource {
    async fn next_event(&mut self) -> std::result::Result<Option<HostEvent>, BoxError> {
        Err(std::io::Error::other("input device lost").into())
    }
}

#[tokio::test]
async fn event_source_failure_is_fatal() -> Result<()> {
    let mut bridge = bootstrap(PROBE, 8, 8).await?;

    let err = bridge
        .run(&mut BrokenSource)
        .await
        .expect_err("event source fails");

    assert!(matches!(err, Error::Host(_)), "{err}");
    assert_eq!(bridge.ticks(), 0);
    Ok(())
}
