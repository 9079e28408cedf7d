use bulwark_system_movement::{
    choose_heading, integrate, separation, steer, tile_of, unstick, Body,
};
use glam::{DVec2, IVec2};

const DT: f64 = 0.05;

/// Flow-field cost of a one-tile-high corridor whose exit is the left column.
fn corridor(width: i32) -> impl Fn(IVec2) -> Option<f64> {
    move |tile| (tile.y == 0 && (0..width).contains(&tile.x)).then(|| f64::from(tile.x))
}

#[test]
fn an_enemy_walks_down_a_corridor_to_the_exit() {
    let cost = corridor(6);
    let bounds = DVec2::new(6.0, 1.0);
    let mut position = DVec2::new(5.5, 0.5);
    let mut velocity = DVec2::ZERO;
    let mut tile = tile_of(position);
    let mut previous = None;
    let mut heading = choose_heading(tile, previous, &cost, 0.5);
    assert_eq!(heading, IVec2::new(4, 0));

    let mut steps = 0;
    while tile.x > 0 {
        steps += 1;
        assert!(steps < 400, "enemy never reached the exit");

        velocity = steer(velocity, tile, heading, 1.0);
        let next = integrate(position, velocity, DT, bounds);
        assert!(next.x <= position.x, "enemy turned back at step {steps}");
        assert_eq!(next.y, 0.5);
        position = next;

        let entered = tile_of(position);
        if entered != tile {
            previous = Some(tile);
            tile = entered;
            heading = choose_heading(tile, previous, &cost, 0.5);
        }
    }
    assert!(steps > 90, "enemy moved faster than its speed allows");
}

#[test]
fn the_tile_just_left_is_never_chosen_again() {
    let cost = corridor(6);
    for roll in [0.0, 0.25, 0.5, 0.75, 0.999] {
        let heading = choose_heading(IVec2::new(3, 0), Some(IVec2::new(2, 0)), &cost, roll);
        assert_eq!(heading, IVec2::new(4, 0), "roll {roll}");
    }
}

#[test]
fn equal_bodies_push_each_other_symmetrically() {
    let a = Body {
        position: DVec2::new(0.0, 0.0),
        size: 1.0,
        weight: 1.0,
    };
    let b = Body {
        position: DVec2::new(0.2, 0.0),
        ..a
    };

    let on_a = separation(a, [b]);
    let on_b = separation(b, [a]);
    assert!(on_a.x < 0.0);
    assert_eq!(on_a, -on_b);

    let far = Body {
        position: DVec2::new(1.5, 0.0),
        ..a
    };
    assert_eq!(separation(a, [far]), DVec2::ZERO);
}

#[test]
fn enclosed_enemies_are_pushed_toward_their_heading() {
    let tile = IVec2::new(2, 2);
    let velocity = unstick(
        DVec2::new(1.0, 0.0),
        DVec2::new(2.5, 2.5),
        tile,
        IVec2::new(2, 1),
        |_| false,
    );
    assert_eq!(velocity, DVec2::new(0.7, -0.5));
}
