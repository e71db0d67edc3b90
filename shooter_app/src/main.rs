//! First-person shooting demo (headless)
//!
//! Exercises the scene-graph and physics core the way the rendered game
//! does: a player with a camera rig, enemies cloned from a prefab at
//! spawnpoints, bullets cloned from a prefab and fired at the nearest
//! enemy, hits scored and enemies respawned. Runs a fixed number of
//! frames and reports the score instead of drawing anything.

use rand::Rng;
use scene_engine::prelude::*;
use scene_engine::scene::CameraHandle;
use std::path::Path;

const DT: f32 = 1.0 / 60.0;
const TOTAL_FRAMES: u32 = 240;
const SHOOT_INTERVAL: u32 = 50;
const BULLET_SPEED: f32 = 18.0;
const ENEMY_CHASE_IMPULSE: f32 = 0.12;
const SETTINGS_PATH: &str = "physics.toml";

pub struct ShooterDemo {
    graph: SceneGraph,
    physics: PhysicsWorld,
    player: NodeKey,
    camera: NodeKey,
    shoot_point: NodeKey,
    enemy_prefab: NodeKey,
    bullet_prefab: NodeKey,
    spawnpoints: Vec<NodeKey>,
    enemies: Vec<NodeKey>,
    bullets: Vec<NodeKey>,
    score: u32,
}

impl ShooterDemo {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        log::info!("Creating shooter demo...");
        let mut graph = SceneGraph::new();

        Self::build_level(&mut graph);
        let spawnpoints = Self::build_spawnpoints(&mut graph);
        Self::build_player(&mut graph);

        // Prefabs live in the arena but outside the scene list, so
        // they are never rendered or simulated; clones of them are.
        let enemy_prefab = graph.spawn(
            &NodeDesc::new()
                .with_name("Enemy")
                .with_scale(Vec3::new(0.5, 0.9, 0.5))
                .with_tag(Tag::Hittable)
                .with_shape_class(ShapeClass::Humanoid)
                .with_mass_class(MassClass::Dynamic(45.0)),
        );
        let bullet_prefab = graph.spawn(
            &NodeDesc::new()
                .with_name("Bullet")
                .with_scale(Vec3::new(0.1, 0.1, 0.1))
                .with_tag(Tag::Bullet)
                .with_mass_class(MassClass::Dynamic(1.0)),
        );

        // Startup validation: fail fast if the scene is unusable
        if graph.roots().is_empty() {
            return Err(Box::new(SceneError::MissingDefaultScene));
        }
        let player = graph.require("Player")?;
        let camera = graph.require_camera("Camera")?;
        let shoot_point = graph.require("ShootPoint")?;

        let settings = if Path::new(SETTINGS_PATH).exists() {
            log::info!("Loading physics settings from {SETTINGS_PATH}");
            PhysicsSettings::load_from_file(SETTINGS_PATH)?
        } else {
            PhysicsSettings::default()
        };

        let mut physics = PhysicsWorld::with_settings(PhysicsContext::load(), settings);
        physics.prepare_world(&graph)?;
        log::info!(
            "Scene ready: {} node(s), {} tracked by physics",
            graph.len(),
            physics.tracked_nodes().len()
        );

        Ok(Self {
            graph,
            physics,
            player,
            camera,
            shoot_point,
            enemy_prefab,
            bullet_prefab,
            spawnpoints,
            enemies: Vec::new(),
            bullets: Vec::new(),
            score: 0,
        })
    }

    fn build_level(graph: &mut SceneGraph) {
        graph.spawn_root(
            &NodeDesc::new()
                .with_name("Ground")
                .with_translation(Vec3::new(0.0, -0.5, 0.0))
                .with_scale(Vec3::new(20.0, 0.5, 20.0))
                .with_mass_class(MassClass::Static),
        );
        for (index, x) in [-6.0_f32, 6.0].iter().enumerate() {
            graph.spawn_root(
                &NodeDesc::new()
                    .with_name(format!("Crate.{index}"))
                    .with_translation(Vec3::new(*x, 1.0, -4.0))
                    .with_mass_class(MassClass::Static),
            );
        }
    }

    fn build_spawnpoints(graph: &mut SceneGraph) -> Vec<NodeKey> {
        [
            Vec3::new(-5.0, 1.0, -8.0),
            Vec3::new(0.0, 1.0, -10.0),
            Vec3::new(5.0, 1.0, -8.0),
        ]
        .into_iter()
        .enumerate()
        .map(|(index, position)| {
            graph.spawn_root(
                &NodeDesc::new()
                    .with_name(format!("Spawnpoint.{index}"))
                    .with_translation(position),
            )
        })
        .collect()
    }

    fn build_player(graph: &mut SceneGraph) {
        graph.spawn_root(
            &NodeDesc::new()
                .with_name("Player")
                .with_translation(Vec3::new(0.0, 1.0, 6.0))
                .with_scale(Vec3::new(0.5, 0.9, 0.5))
                .with_shape_class(ShapeClass::Humanoid)
                .with_mass_class(MassClass::Dynamic(60.0))
                .with_child(
                    NodeDesc::new()
                        .with_name("Head")
                        .with_translation(Vec3::new(0.0, 0.8, 0.0))
                        .with_child(
                            NodeDesc::new()
                                .with_name("Camera")
                                .with_camera(CameraHandle(0)),
                        )
                        .with_child(
                            NodeDesc::new()
                                .with_name("ShootPoint")
                                .with_translation(Vec3::new(0.0, 0.0, -0.6)),
                        ),
                ),
        );
    }

    fn spawn_enemy(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let spawnpoint = self.spawnpoints[rand::thread_rng().gen_range(0..self.spawnpoints.len())];
        let position = self
            .graph
            .get(spawnpoint)
            .map_or_else(Vec3::zeros, |node| node.translation);

        let enemy = self
            .graph
            .clone_subtree(self.enemy_prefab)
            .ok_or("enemy prefab missing from scene graph")?;
        if let Some(node) = self.graph.get_mut(enemy) {
            node.translation = position;
            node.update_matrix();
        }
        self.graph.add_root(enemy);
        self.physics.add_node(&self.graph, enemy)?;
        self.enemies.push(enemy);
        log::info!("Enemy spawned at ({:.1}, {:.1}, {:.1})", position.x, position.y, position.z);
        Ok(())
    }

    fn shoot(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Aim at the nearest live enemy; hold fire when there is none
        let muzzle = self.graph.global_matrix(self.shoot_point);
        let origin = Vec3::new(muzzle.m14, muzzle.m24, muzzle.m34);
        let Some(target) = self.nearest_enemy(origin) else {
            return Ok(());
        };

        let bullet = self
            .graph
            .clone_subtree(self.bullet_prefab)
            .ok_or("bullet prefab missing from scene graph")?;
        let aim = self
            .graph
            .get(target)
            .map_or_else(Vec3::zeros, |node| node.translation);
        let direction = (aim - origin).normalize();
        if let Some(node) = self.graph.get_mut(bullet) {
            node.translation = origin;
            node.update_matrix();
            node.acceleration = direction * BULLET_SPEED;
        }
        self.graph.add_root(bullet);
        self.physics.add_node(&self.graph, bullet)?;
        self.bullets.push(bullet);
        log::debug!("Bullet fired toward ({:.1}, {:.1}, {:.1})", aim.x, aim.y, aim.z);
        Ok(())
    }

    fn nearest_enemy(&self, origin: Vec3) -> Option<NodeKey> {
        self.enemies
            .iter()
            .copied()
            .filter_map(|key| {
                let node = self.graph.get(key)?;
                Some((key, (node.translation - origin).norm_squared()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| key)
    }

    fn steer_enemies(&mut self) {
        let player_position = self
            .graph
            .get(self.player)
            .map_or_else(Vec3::zeros, |node| node.translation);
        for &enemy in &self.enemies {
            if let Some(node) = self.graph.get_mut(enemy) {
                let mut to_player = player_position - node.translation;
                to_player.y = 0.0;
                if to_player.norm_squared() > 1.0 {
                    node.acceleration = to_player.normalize() * ENEMY_CHASE_IMPULSE;
                } else {
                    node.acceleration = Vec3::zeros();
                }
            }
        }
    }

    fn handle_hits(&mut self, events: Vec<HitEvent>) -> Result<(), Box<dyn std::error::Error>> {
        for event in events {
            self.score += 1;
            log::info!("Hit! Score: {}", self.score);
            if self.enemies.contains(&event.target) {
                self.physics.destroy_node(&mut self.graph, event.target);
                self.enemies.retain(|&key| key != event.target);
                self.spawn_enemy()?;
            }
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<u32, Box<dyn std::error::Error>> {
        self.spawn_enemy()?;
        let mut timer = Timer::new();

        for frame in 0..TOTAL_FRAMES {
            self.steer_enemies();
            if frame % SHOOT_INTERVAL == SHOOT_INTERVAL - 1 {
                self.shoot()?;
            }
            // Hop once early on, like a player testing the controls
            if frame == 30 {
                if let Some(node) = self.graph.get_mut(self.player) {
                    node.jump_force = Some(Vec3::new(0.0, 250.0, 0.0));
                }
            }

            let events = self.physics.update(&mut self.graph, DT);
            self.handle_hits(events)?;

            // One-shot inputs are consumed by the step they fed
            if let Some(node) = self.graph.get_mut(self.player) {
                node.jump_force = None;
            }
            self.bullets.retain(|&key| self.graph.contains(key));
            for &bullet in &self.bullets {
                if let Some(node) = self.graph.get_mut(bullet) {
                    node.acceleration = Vec3::zeros();
                }
            }

            timer.update();
            if frame % 60 == 59 {
                let view = self.graph.global_matrix(self.camera);
                log::info!(
                    "frame {:3}: camera at ({:.2}, {:.2}, {:.2}), {} node(s), avg {:.0} fps",
                    frame + 1,
                    view.m14,
                    view.m24,
                    view.m34,
                    self.graph.len(),
                    timer.average_fps()
                );
            }
        }

        Ok(self.score)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    scene_engine::foundation::logging::init();
    let mut demo = ShooterDemo::new()?;
    let score = demo.run()?;
    log::info!("Demo finished with score {score}");
    println!("Final score: {score}");
    Ok(())
}
