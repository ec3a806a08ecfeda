//! Demo driver: walks a simulated user away from an annotation anchored at
//! Big Ben and prints how the placement confirms and the transform evolves.

use nalgebra::Vector3;

use geoanchor::{
    AnnotationBuilder, CameraPose, EstimationMode, FixChannel, GeoCoordinate, LocationFix,
    Reconciler,
};

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

fn main() {
    env_logger::init();

    let big_ben = GeoCoordinate::new(51.5007, -0.1246);

    let mut reconciler = Reconciler::new(EstimationMode::Filtered);
    let annotation = AnnotationBuilder::text("Big Ben")
        .build()
        .expect("demo annotation is well formed");
    let id = reconciler.insert(annotation);

    // Placement made while standing at the landmark; the coordinate is
    // assigned but stays unconfirmed until the user walks away.
    reconciler
        .assign_location(id, big_ben)
        .expect("freshly inserted node accepts a coordinate");

    let channel = FixChannel::new();

    println!("Walking north away from Big Ben, one fix per 10 m step:\n");
    for step in 0..=20u64 {
        let meters = step as f64 * 10.0;
        let user = GeoCoordinate::new(
            big_ben.latitude + meters / METERS_PER_DEGREE_LAT,
            big_ben.longitude,
        );
        channel.publish(LocationFix::new(step * 1000, user, 5.0));

        // The tracking session moves the camera -z as the user walks north
        let pose = CameraPose::new(
            Vector3::new(0.0, 1.6, -meters),
            nalgebra::UnitQuaternion::identity(),
        );

        if let Some(fix) = channel.snapshot() {
            let report = reconciler.update(&pose, &fix);
            let node = reconciler.node(id).expect("node stays managed");
            let transform = node.transform();
            println!(
                "{:>4.0} m  confirmed={:<5}  position=({:6.1}, {:4.1}, {:6.1})  scale={:5.2}{}",
                meters,
                node.anchor().is_location_confirmed(),
                transform.position.x,
                transform.position.y,
                transform.position.z,
                transform.scale,
                if report.confirmed > 0 { "  <- locked in" } else { "" },
            );
        }
    }
}
