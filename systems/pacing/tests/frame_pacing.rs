use std::{convert::Infallible, time::Duration};

use bulwark_system_pacing::{FramePacer, PacerConfig};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn sixty_hertz_frames_run_one_step_every_third_frame() {
    let mut pacer = FramePacer::default();
    let frame = Duration::from_micros(16_667);

    let steps: Vec<u32> = (0..9).map(|_| pacer.advance(frame)).collect();

    assert_eq!(steps, vec![0, 0, 1, 0, 0, 1, 0, 0, 1]);
}

#[test]
fn a_stall_is_capped_and_the_carry_clamped() {
    let mut pacer = FramePacer::default();

    assert_eq!(pacer.advance(ms(2_000)), 1);
    assert_eq!(pacer.carry(), ms(75));

    assert_eq!(pacer.advance(ms(0)), 1);
    assert_eq!(pacer.carry(), ms(25));
    assert!((pacer.interpolation() - 0.5).abs() < 1e-9);
}

#[test]
fn fast_speeds_catch_up_several_steps_per_frame() {
    let mut pacer = FramePacer::default();
    pacer.set_speed(16.0);

    assert_eq!(pacer.advance(ms(100)), 6);
    assert_eq!(pacer.carry(), ms(75));
}

#[test]
fn absurd_speeds_run_at_the_fastest_setting() {
    let mut pacer = FramePacer::default();
    pacer.set_speed(1e300);

    assert_eq!(pacer.advance(ms(100)), 6);
    assert_eq!(pacer.carry(), ms(75));
    assert_eq!(pacer.advance(Duration::MAX), 6);
    assert_eq!(pacer.carry(), ms(75));
}

#[test]
fn exactly_one_step_of_time_waits_for_the_next_frame() {
    let mut pacer = FramePacer::new(PacerConfig {
        step: ms(50),
        max_carry: ms(75),
    });

    assert_eq!(pacer.advance(ms(50)), 0);
    assert_eq!(pacer.advance(ms(1)), 1);
    assert_eq!(pacer.carry(), ms(1));
}

#[test]
fn pausing_discards_the_carry() {
    let mut pacer = FramePacer::default();
    let _ = pacer.advance(ms(40));
    pacer.set_speed(0.0);

    assert_eq!(pacer.advance(ms(500)), 0);
    assert_eq!(pacer.carry(), Duration::ZERO);
}

#[test]
fn run_invokes_the_step_for_every_due_tick() {
    let mut pacer = FramePacer::default();
    pacer.set_speed(8.0);
    let mut ticks = 0;

    let ran = pacer
        .run(ms(20), || {
            ticks += 1;
            Ok::<(), Infallible>(())
        })
        .expect("infallible");

    assert_eq!(ran, 3);
    assert_eq!(ticks, 3);
}

#[test]
fn run_stops_at_the_first_failure() {
    let mut pacer = FramePacer::default();
    pacer.set_speed(16.0);
    let mut attempts = 0;

    let result = pacer.run(ms(100), || {
        attempts += 1;
        if attempts == 2 {
            Err("lost")
        } else {
            Ok(())
        }
    });

    assert_eq!(result, Err("lost"));
    assert_eq!(attempts, 2);
}
