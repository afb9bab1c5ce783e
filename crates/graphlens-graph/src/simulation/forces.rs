use super::quadtree::QuadNode;
use crate::Vec2;

/// Squared distance below which charge stops growing.
const MIN_DISTANCE_SQ: f32 = 1.0;

/// Tiny deterministic offset for coincident points.
fn jiggle(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin()) * 1e-6
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Link {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
    /// Share of the correction applied to the target.
    pub(super) bias: f32,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) theta: f32,
    pub(super) alpha: f32,
}

fn charge_from(delta: Vec2, mass: f32, params: ChargeParams) -> Vec2 {
    let mut distance_sq = delta.length_sq();
    if distance_sq < MIN_DISTANCE_SQ {
        distance_sq = (MIN_DISTANCE_SQ * distance_sq).sqrt().max(f32::EPSILON);
    }
    delta * (params.strength * mass * params.alpha / distance_sq)
}

/// Many-body charge on `index`, approximating far cells by their centre of mass.
pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = positions[other_index] - point;
            if delta == Vec2::ZERO {
                delta = jiggle(index, other_index);
            }
            *velocity += charge_from(delta, 1.0, params);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq();
    let width = node.bounds.side_length();
    let can_approximate =
        !node.bounds.contains(point) && width * width < params.theta * params.theta * distance_sq;

    if can_approximate {
        *velocity += charge_from(delta, node.mass, params);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, params, velocity);
    }
}

/// Pull linked nodes toward their target distance.
pub(super) fn apply_links(
    links: &[Link],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
) {
    for (link_index, link) in links.iter().enumerate() {
        let source = positions[link.source] + velocities[link.source];
        let target = positions[link.target] + velocities[link.target];
        let mut delta = target - source;
        if delta == Vec2::ZERO {
            delta = jiggle(link_index, link.target);
        }
        let length = delta.length();
        let correction = delta * ((length - link.distance) / length * alpha * link.strength);
        velocities[link.target] -= correction * link.bias;
        velocities[link.source] += correction * (1.0 - link.bias);
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) max_reach_sq: f32,
}

fn collide_pair(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let mut delta = predicted[from] - predicted[to];
    if delta == Vec2::ZERO {
        delta = jiggle(from, to);
    }
    let reach = radii[from] + radii[to];
    let distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }
    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };
    velocities[from] += push * share;
    velocities[to] -= push * (1.0 - share);
}

/// Separate overlapping circles, visiting only cells close enough to touch.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_reach_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for i in 0..node_a.indices.len() {
                for j in (i + 1)..node_a.indices.len() {
                    collide_pair(
                        node_a.indices[i],
                        node_a.indices[j],
                        predicted,
                        radii,
                        params.strength,
                        velocities,
                    );
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    collide_pair(from, to, predicted, radii, params.strength, velocities);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };
            accumulate_collision_pairs(child_a, child_a, true, predicted, radii, params, velocities);
            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, predicted, radii, params, velocities,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, predicted, radii, params, velocities);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, predicted, radii, params, velocities);
        }
    }
}

/// Weak pull of every node toward the origin along each axis.
pub(super) fn apply_centering(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    strength: f32,
    alpha: f32,
) {
    for (position, velocity) in positions.iter().zip(velocities.iter_mut()) {
        *velocity -= *position * (strength * alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_repels() {
        let positions = vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let tree = QuadNode::build(&positions).unwrap();
        let params = ChargeParams {
            strength: -400.0,
            theta: 0.9,
            alpha: 1.0,
        };
        let mut left = Vec2::ZERO;
        let mut right = Vec2::ZERO;
        accumulate_charge_for_node(&tree, 0, &positions, params, &mut left);
        accumulate_charge_for_node(&tree, 1, &positions, params, &mut right);
        assert!(left.x < 0.0);
        assert!(right.x > 0.0);
        // strength * alpha / distance
        assert!((right.x - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_links_pull_toward_distance() {
        let positions = vec![Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0)];
        let mut velocities = vec![Vec2::ZERO; 2];
        let link = Link {
            source: 0,
            target: 1,
            distance: 100.0,
            strength: 1.0,
            bias: 0.5,
        };
        apply_links(&[link], &positions, &mut velocities, 1.0);
        assert!((velocities[0].x - 50.0).abs() < 1e-3);
        assert!((velocities[1].x + 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_collision_separates_overlap() {
        let positions = vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let radii = vec![20.0, 20.0];
        let mut velocities = vec![Vec2::ZERO; 2];
        let tree = QuadNode::build(&positions).unwrap();
        let params = CollisionParams {
            strength: 1.0,
            max_reach_sq: 40.0 * 40.0,
        };
        accumulate_collision_pairs(&tree, &tree, true, &positions, &radii, params, &mut velocities);
        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
        assert!((velocities[1].x - velocities[0].x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_centering_pulls_to_origin() {
        let positions = vec![Vec2::new(100.0, -50.0)];
        let mut velocities = vec![Vec2::ZERO];
        apply_centering(&positions, &mut velocities, 0.03, 1.0);
        assert!((velocities[0].x + 3.0).abs() < 1e-4);
        assert!((velocities[0].y - 1.5).abs() < 1e-4);
    }
}
