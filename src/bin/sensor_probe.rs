use skeletal_stream::sensor::{SensorSession, SimulatedSensor};
use skeletal_stream::Joint;

const ATTEMPTS: usize = 5;

fn main() {
    println!("Probing sensor session...\n");

    let mut sensor = SimulatedSensor::new(2);

    if let Err(e) = sensor.open() {
        println!("✗ Failed to open sensor: {}", e);
        return;
    }
    println!("✓ Sensor opened");

    let mut polled = false;
    for attempt in 1..=ATTEMPTS {
        match sensor.poll(1.0, 0.02) {
            Ok(()) => {
                println!("✓ Frame acquired on attempt {}", attempt);
                polled = true;
                break;
            }
            Err(e) => println!("✗ Poll {} failed: {}", attempt, e),
        }
    }

    if polled {
        if let Some(plane) = sensor.floor_plane() {
            println!(
                "  floor: normal=({:.3}, {:.3}, {:.3}) height={:.3}",
                plane.normal.x, plane.normal.y, plane.normal.z, plane.height
            );
        }
        for body in sensor.bodies() {
            if !body.tracked {
                println!("  body {}: not tracked", body.id);
                continue;
            }
            let tracked_joints = body.joints.iter().filter(|j| j.tracked).count();
            let head = body.observation(Joint::Head).position;
            println!(
                "  body {}: {}/{} joints, head at ({:.3}, {:.3}, {:.3})",
                body.id,
                tracked_joints,
                Joint::COUNT,
                head.x,
                head.y,
                head.z
            );
        }
    }

    match sensor.close() {
        Ok(()) => println!("\n✓ Sensor closed"),
        Err(e) => println!("\n✗ Failed to close sensor: {}", e),
    }
}
