use proptest::prelude::*;

use dawn_engine::net::CNetTransform;
use dawn_shared::{
    math::{Colour, Quat, Vec3},
    BitReader, BitWriter, EntityId, RepLayout, RepSnapshot, SceneManager,
};
use dawn_test::{CProjectile, CShipControls, ShooterPipeline, PROJECTILE, SHIP};

fn coordinate() -> impl Strategy<Value = f32> {
    -1.0e4f32..1.0e4f32
}

fn vec3() -> impl Strategy<Value = Vec3> {
    (coordinate(), coordinate(), coordinate()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn quat() -> impl Strategy<Value = Quat> {
    (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
        .prop_map(|(x, y, z, w)| Quat { x, y, z, w })
}

fn transform() -> impl Strategy<Value = CNetTransform> {
    (vec3(), quat(), vec3(), vec3()).prop_map(
        |(position, orientation, velocity, angular_velocity)| CNetTransform {
            position,
            orientation,
            velocity,
            angular_velocity,
        },
    )
}

fn controls() -> impl Strategy<Value = CShipControls> {
    (vec3(), vec3(), any::<bool>()).prop_map(|(linear, angular, firing)| CShipControls {
        target_linear_velocity: linear,
        target_angular_velocity: angular,
        firing_weapon: firing,
        hits_taken: 0,
    })
}

fn projectile() -> impl Strategy<Value = CProjectile> {
    (any::<u32>(), vec3(), vec3(), vec3(), any::<[u8; 4]>()).prop_map(
        |(kind, position, direction, velocity, [r, g, b, a])| CProjectile {
            kind,
            position,
            direction,
            velocity,
            colour: Colour::rgba(r, g, b, a),
        },
    )
}

#[derive(Debug, Clone)]
enum Mutation {
    Position(Vec3),
    Orientation(Quat),
    Velocity(Vec3),
    LinearTarget(Vec3),
    Firing(bool),
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        vec3().prop_map(Mutation::Position),
        quat().prop_map(Mutation::Orientation),
        vec3().prop_map(Mutation::Velocity),
        vec3().prop_map(Mutation::LinearTarget),
        any::<bool>().prop_map(Mutation::Firing),
    ]
}

fn ship_scene(transform: CNetTransform, controls: CShipControls) -> (SceneManager, EntityId) {
    let mut scene = SceneManager::new();
    let id = scene.create_entity(SHIP);
    scene.insert_component(id, transform).unwrap();
    scene.insert_component(id, controls).unwrap();
    (scene, id)
}

fn apply(scene: &mut SceneManager, id: EntityId, mutation: &Mutation) {
    match mutation {
        Mutation::Position(value) => transform_of(scene, id).position = *value,
        Mutation::Orientation(value) => transform_of(scene, id).orientation = *value,
        Mutation::Velocity(value) => transform_of(scene, id).velocity = *value,
        Mutation::LinearTarget(value) => controls_of(scene, id).target_linear_velocity = *value,
        Mutation::Firing(value) => controls_of(scene, id).firing_weapon = *value,
    }
}

fn transform_of(scene: &mut SceneManager, id: EntityId) -> &mut CNetTransform {
    scene.component_mut::<CNetTransform>(id).unwrap()
}

fn controls_of(scene: &mut SceneManager, id: EntityId) -> &mut CShipControls {
    scene.component_mut::<CShipControls>(id).unwrap()
}

fn ship_layout() -> RepLayout {
    RepLayout::build::<(CNetTransform, CShipControls)>()
}

proptest! {
    #[test]
    fn ship_state_round_trips(transform in transform(), controls in controls()) {
        let layout = ship_layout();
        let (source, id) = ship_scene(transform.clone(), controls.clone());
        let (mut target, target_id) = ship_scene(CNetTransform::default(), CShipControls::default());

        let mut writer = BitWriter::new();
        layout.write_full(source.entity(id).unwrap(), &mut writer).unwrap();
        let bytes = writer.to_vec();
        layout
            .read_full(target.entity_mut(target_id).unwrap(), &mut BitReader::new(&bytes))
            .unwrap();

        prop_assert_eq!(target.component::<CNetTransform>(target_id), Some(&transform));
        prop_assert_eq!(target.component::<CShipControls>(target_id), Some(&controls));
    }

    #[test]
    fn projectile_state_round_trips(projectile in projectile()) {
        let layout = RepLayout::build::<(CProjectile,)>();
        let mut source = SceneManager::new();
        let id = source.create_entity(PROJECTILE);
        source.insert_component(id, projectile.clone()).unwrap();
        let mut target = SceneManager::new();
        let target_id = target.create_entity(PROJECTILE);
        target.insert_component(target_id, CProjectile::default()).unwrap();

        let mut writer = BitWriter::new();
        layout.write_full(source.entity(id).unwrap(), &mut writer).unwrap();
        let bytes = writer.to_vec();
        layout
            .read_full(target.entity_mut(target_id).unwrap(), &mut BitReader::new(&bytes))
            .unwrap();

        prop_assert_eq!(target.component::<CProjectile>(target_id), Some(&projectile));
    }

    /// Deltas written against the acknowledged state and every unacknowledged
    /// one bring the reader up to date whichever of them it holds
    #[test]
    fn deltas_survive_lost_updates(
        start in transform(),
        steps in proptest::collection::vec((mutation(), any::<bool>()), 1..40),
    ) {
        let layout = ship_layout();
        let (mut source, id) = ship_scene(start.clone(), CShipControls::default());
        let (mut target, target_id) = ship_scene(start, CShipControls::default());

        let mut baseline = layout.snapshot(source.entity(id).unwrap()).unwrap();
        let mut pending: Vec<RepSnapshot> = Vec::new();
        for (mutation, lost) in &steps {
            apply(&mut source, id, mutation);
            let baselines: Vec<&RepSnapshot> =
                std::iter::once(&baseline).chain(pending.iter()).collect();
            let mut writer = BitWriter::new();
            let snapshot = layout
                .write_delta_since(source.entity(id).unwrap(), &baselines, &mut writer)
                .unwrap();
            let bytes = writer.to_vec();

            if *lost {
                pending.push(snapshot);
                continue;
            }
            layout
                .read_delta(target.entity_mut(target_id).unwrap(), &mut BitReader::new(&bytes))
                .unwrap();
            let reached = layout.snapshot(target.entity(target_id).unwrap()).unwrap();
            prop_assert_eq!(&reached, &snapshot);
            baseline = snapshot;
            pending.clear();
        }
    }
}

#[test]
fn pipeline_layout_matches_a_fresh_build() {
    assert_eq!(
        ShooterPipeline::new().ship_layout().fingerprint(),
        ship_layout().fingerprint()
    );
}
