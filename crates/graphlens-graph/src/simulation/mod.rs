//! Tick-driven force layout over the nodes of a [`GraphModel`].

mod forces;
mod quadtree;

use crate::{GraphModel, Vec2};
use forces::{
    ChargeParams, CollisionParams, Link, accumulate_charge_for_node, accumulate_collision_pairs,
    apply_centering, apply_links,
};
use quadtree::QuadNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const COLLIDE_STRENGTH: f32 = 1.0;
/// Alpha decays from its start to `alpha_min` over this many ticks.
const DECAY_TICKS: f32 = 300.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub charge_strength: f32,
    pub link_distance: f32,
    pub collide_margin: f32,
    pub center_strength: f32,
    pub velocity_decay: f32,
    pub alpha: f32,
    pub alpha_min: f32,
    pub alpha_target: f32,
    pub drag_alpha: f32,
    pub drag_alpha_target: f32,
    pub precompute_ticks: usize,
    pub ticks_per_render: usize,
    pub barnes_hut_theta: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            charge_strength: -400.0,
            link_distance: 45.0,
            collide_margin: 25.0,
            center_strength: 0.03,
            velocity_decay: 0.4,
            alpha: 1.0,
            alpha_min: 0.05,
            alpha_target: 0.0,
            drag_alpha: 0.8,
            drag_alpha_target: 0.09,
            precompute_ticks: 300,
            ticks_per_render: 10,
            barnes_hut_theta: 0.9,
        }
    }
}

impl SimulationSettings {
    pub fn alpha_decay(&self) -> f32 {
        1.0 - self.alpha_min.powf(1.0 / DECAY_TICKS)
    }
}

/// Physics solver moving node positions toward equilibrium.
///
/// `alpha` cools toward `alpha_target` on every step. The simulation counts as
/// running while alpha stays above `alpha_min`; dragging raises the target so
/// the layout stays live until the drag ends.
#[derive(Debug)]
pub struct ForceSimulation {
    settings: SimulationSettings,
    alpha: f32,
    alpha_target: f32,
    stopped: bool,
    links: Vec<Link>,
    links_revision: Option<u64>,
}

impl ForceSimulation {
    pub fn new(settings: SimulationSettings) -> Self {
        let alpha = settings.alpha;
        let alpha_target = settings.alpha_target;
        Self {
            settings,
            alpha,
            alpha_target,
            stopped: false,
            links: Vec::new(),
            links_revision: None,
        }
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        !self.stopped && self.alpha >= self.settings.alpha_min
    }

    /// Give every unplaced node a starting position.
    ///
    /// Children of an expanded node go on a ring around their parent. Anything
    /// else is spread over a circle whose radius grows with the node count.
    pub fn seed_positions(&self, model: &mut GraphModel) -> usize {
        let count = model.node_count();
        let circle_radius = count as f32 * self.settings.link_distance / std::f32::consts::TAU;
        let mut seeds = Vec::new();

        for (index, node) in model.nodes().iter().enumerate() {
            if node.position.is_some() {
                continue;
            }

            let around_parent = model.expansion_parent(node.id()).and_then(|parent_id| {
                let parent = model.find_node(parent_id)?;
                let centre = parent.position?;
                let siblings = model.expanded_children(parent_id);
                let slot = siblings.iter().position(|id| id == node.id())?;
                let angle = 360.0 * slot as f32 / siblings.len() as f32;
                let reach = parent.radius + node.radius + 2.0 * self.settings.link_distance;
                Some(centre + Vec2::from_angle(angle) * reach)
            });

            let position = around_parent.unwrap_or_else(|| {
                let theta = std::f32::consts::TAU * index as f32 / count as f32;
                Vec2::new(circle_radius * theta.sin(), circle_radius * theta.cos())
            });
            seeds.push((index, position));
        }

        let seeded = seeds.len();
        let nodes = model.nodes_mut();
        for (index, position) in seeds {
            nodes[index].position = Some(position);
        }
        if seeded > 0 {
            tracing::debug!("Seeded {} node positions", seeded);
        }
        seeded
    }

    /// Settle a freshly loaded graph without rendering.
    pub fn precompute(&mut self, model: &mut GraphModel) {
        self.restart();
        let mut ticks = 0;
        while ticks < self.settings.precompute_ticks && self.is_running() {
            self.step(model);
            ticks += 1;
        }
        tracing::debug!(
            "Precomputed {} ticks for {} nodes, alpha {:.3}",
            ticks,
            model.node_count(),
            self.alpha
        );
    }

    /// Reheat to the starting alpha and resume.
    pub fn restart(&mut self) {
        self.alpha = self.settings.alpha;
        self.stopped = false;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn drag_started(&mut self) {
        self.alpha_target = self.settings.drag_alpha_target;
        self.alpha = self.alpha.max(self.settings.drag_alpha);
        self.stopped = false;
    }

    pub fn drag_ended(&mut self) {
        self.alpha_target = self.settings.alpha_target;
    }

    /// Run one batch of `ticks_per_render` steps. Returns true when the caller
    /// should render.
    pub fn tick(&mut self, model: &mut GraphModel) -> bool {
        if !self.is_running() {
            return false;
        }
        for _ in 0..self.settings.ticks_per_render.max(1) {
            if !self.step(model) {
                break;
            }
        }
        true
    }

    /// Advance the physics by a single step. Returns whether the simulation is
    /// still running afterwards.
    pub fn step(&mut self, model: &mut GraphModel) -> bool {
        if model.node_count() == 0 {
            return false;
        }

        self.seed_positions(model);
        self.refresh_links(model);

        self.alpha += (self.alpha_target - self.alpha) * self.settings.alpha_decay();
        let alpha = self.alpha;

        let positions: Vec<Vec2> = model
            .nodes()
            .iter()
            .map(|node| node.position.unwrap_or(Vec2::ZERO))
            .collect();
        let mut velocities: Vec<Vec2> = model.nodes().iter().map(|node| node.velocity).collect();
        let radii: Vec<f32> = model
            .nodes()
            .iter()
            .map(|node| node.radius + self.settings.collide_margin)
            .collect();

        for link in &mut self.links {
            link.distance = model.nodes()[link.source].radius
                + model.nodes()[link.target].radius
                + 2.0 * self.settings.link_distance;
        }
        apply_links(&self.links, &positions, &mut velocities, alpha);

        if let Some(tree) = QuadNode::build(&positions) {
            let params = ChargeParams {
                strength: self.settings.charge_strength,
                theta: self.settings.barnes_hut_theta,
                alpha,
            };
            for (index, velocity) in velocities.iter_mut().enumerate() {
                accumulate_charge_for_node(&tree, index, &positions, params, velocity);
            }
        }

        let predicted: Vec<Vec2> = positions
            .iter()
            .zip(&velocities)
            .map(|(position, velocity)| *position + *velocity)
            .collect();
        if let Some(tree) = QuadNode::build(&predicted) {
            let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);
            let reach = max_radius * 2.0;
            let params = CollisionParams {
                strength: COLLIDE_STRENGTH,
                max_reach_sq: reach * reach,
            };
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                &predicted,
                &radii,
                params,
                &mut velocities,
            );
        }

        apply_centering(
            &positions,
            &mut velocities,
            self.settings.center_strength,
            alpha,
        );

        let keep = 1.0 - self.settings.velocity_decay;
        for ((node, position), velocity) in model
            .nodes_mut()
            .iter_mut()
            .zip(positions)
            .zip(velocities)
        {
            if let Some(pinned) = node.pinned {
                node.position = Some(pinned);
                node.velocity = Vec2::ZERO;
                continue;
            }
            let velocity = velocity * keep;
            if !velocity.is_finite() {
                tracing::warn!("Dropping non-finite velocity for node {}", node.id());
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity = velocity;
            node.position = Some(position + velocity);
        }

        self.is_running()
    }

    fn refresh_links(&mut self, model: &GraphModel) {
        if self.links_revision == Some(model.revision()) {
            return;
        }

        let mut endpoints = Vec::new();
        let mut degree: HashMap<usize, f32> = HashMap::new();
        for rel in model.relationships() {
            if rel.is_loop() {
                continue;
            }
            let (Some(source), Some(target)) =
                (model.node_index(&rel.source), model.node_index(&rel.target))
            else {
                continue;
            };
            *degree.entry(source).or_default() += 1.0;
            *degree.entry(target).or_default() += 1.0;
            endpoints.push((source, target));
        }

        self.links = endpoints
            .into_iter()
            .map(|(source, target)| {
                let source_degree = degree[&source];
                let target_degree = degree[&target];
                Link {
                    source,
                    target,
                    distance: 2.0 * self.settings.link_distance,
                    strength: 1.0 / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();
        self.links_revision = Some(model.revision());
    }
}

impl Default for ForceSimulation {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}
