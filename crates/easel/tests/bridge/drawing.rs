use anyhow::Result;
use easel::{BridgeBuilder, Color, HostEvent, QueuedEvents};

use super::common::{TestHost, bootstrap};

const DRAW_IMPORTS: &str = r#"
  (import "env" "set_stroke_color" (func $color (param i32 i32 i32)))
  (import "env" "begin_path" (func $begin))
  (import "env" "move_to" (func $move (param f64 f64)))
  (import "env" "line_to" (func $line (param f64 f64)))
  (import "env" "stroke" (func $stroke))
  (import "env" "clear" (func $clear))
  (import "env" "random" (func $random (result f64)))
"#;

fn drawing_guest(tick_body: &str) -> String {
    format!(
        r#"
(module
  {DRAW_IMPORTS}
  (memory (export "memory") 1)
  (func (export "main"))
  (func (export "tick") {tick_body})
  (func (export "key_down") (param i32))
  (func (export "key_up") (param i32)))
"#
    )
}

fn refreshes(n: usize) -> QueuedEvents {
    std::iter::repeat_n(HostEvent::Refresh, n).collect()
}

#[tokio::test]
async fn tick_strokes_a_red_segment() -> Result<()> {
    let guest = drawing_guest(
        r"
    call $clear
    (call $color (i32.const 255) (i32.const 0) (i32.const 0))
    call $begin
    (call $move (f64.const 0) (f64.const 0))
    (call $line (f64.const 10) (f64.const 0))
    call $stroke",
    );
    let mut bridge = bootstrap(&guest, 32, 8).await?;

    bridge.run(&mut refreshes(1)).await?;

    let frame = &bridge.host().frames[0];
    let red = Color::rgb(255, 0, 0);
    for x in 0..=10 {
        assert_eq!(frame.pixel(x, 0), Some(red), "x = {x}");
    }
    assert_eq!(frame.pixel(11, 0), Some(Color::BLACK));
    assert_eq!(frame.pixel(0, 1), Some(Color::BLACK));
    assert_eq!((frame.width(), frame.height()), (32, 8));
    assert!(!bridge.surface().path_is_empty());
    Ok(())
}

#[tokio::test]
async fn out_of_range_channels_are_clamped() -> Result<()> {
    let guest = drawing_guest(
        r"
    (call $color (i32.const 300) (i32.const -20) (i32.const 128))
    call $begin
    (call $move (f64.const 0) (f64.const 0))
    (call $line (f64.const 0) (f64.const 0))
    call $stroke",
    );
    let mut bridge = bootstrap(&guest, 4, 4).await?;

    bridge.run(&mut refreshes(1)).await?;

    assert_eq!(bridge.surface().pixel(0, 0), Some(Color::rgb(255, 0, 128)));
    Ok(())
}

#[tokio::test]
async fn math_capabilities_match_libm() -> Result<()> {
    let guest = r#"
(module
  (import "env" "sin" (func $sin (param f64) (result f64)))
  (import "env" "cos" (func $cos (param f64) (result f64)))
  (import "env" "fmod" (func $fmod (param f64 f64) (result f64)))
  (import "env" "random" (func $random (result f64)))
  (memory (export "memory") 1)
  (func (export "main")
    (if (f64.ne (call $fmod (f64.const 5.5) (f64.const 2)) (f64.const 1.5)) (then unreachable))
    (if (f64.ne (call $fmod (f64.const -5.5) (f64.const 2)) (f64.const -1.5)) (then unreachable))
    (if (f64.ne (call $sin (f64.const 0)) (f64.const 0)) (then unreachable))
    (if (f64.ne (call $cos (f64.const 0)) (f64.const 1)) (then unreachable)))
  (func (export "tick")
    (local $i i32)
    (local $r f64)
    (loop $draw
      (local.set $r (call $random))
      (if (i32.or (f64.lt (local.get $r) (f64.const 0)) (f64.ge (local.get $r) (f64.const 1)))
        (then unreachable))
      (local.set $i (i32.add (local.get $i) (i32.const 1)))
      (br_if $draw (i32.lt_u (local.get $i) (i32.const 10000)))))
  (func (export "key_down") (param i32))
  (func (export "key_up") (param i32)))
"#;
    let mut bridge = bootstrap(guest, 4, 4).await?;

    bridge.run(&mut refreshes(2)).await?;

    assert_eq!(bridge.ticks(), 2);
    Ok(())
}

#[tokio::test]
async fn seeded_random_is_reproducible() -> Result<()> {
    let guest = drawing_guest(
        r"
    (call $color (i32.const 255) (i32.const 255) (i32.const 255))
    call $begin
    (call $move (f64.mul (call $random) (f64.const 64)) (f64.mul (call $random) (f64.const 64)))
    (call $line (f64.mul (call $random) (f64.const 64)) (f64.mul (call $random) (f64.const 64)))
    call $stroke",
    );

    let mut frames = Vec::new();
    for _ in 0..2 {
        let mut bridge = BridgeBuilder::new()
            .random_seed(42)
            .build(guest.as_str(), TestHost::new(64, 64))
            .await?;
        bridge.run(&mut refreshes(3)).await?;
        frames.push(bridge.surface().pixels().to_vec());
    }

    assert_eq!(frames[0], frames[1]);
    assert!(frames[0].contains(&Color::WHITE));
    Ok(())
}
