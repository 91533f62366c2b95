//! Path following: project the actor onto the path, lead the projection by a
//! fixed arc-length offset, arrive at the led point.

use crate::kinematic::{Kinematic, SteeringOutput};
use crate::steering::basic::dynamic_arrive;
use crate::steering::FollowPath;

pub fn follow_path(actor: &Kinematic, fp: &FollowPath) -> SteeringOutput {
    // An empty or degenerate path is a normal steering outcome, not a fault.
    let Some(param) = fp.path.param(actor.position) else {
        return SteeringOutput::ZERO;
    };
    let target_param = fp.path.advance(param, fp.offset);
    let target = fp.path.position_at(target_param);
    dynamic_arrive(actor, target, &fp.arrive)
}
