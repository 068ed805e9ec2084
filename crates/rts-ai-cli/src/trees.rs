//! Stock tree types the simulator registers with every registry.

use rts_ai_bt::leaves::{
    enemy_in_range, AcquireTarget, ApplyBuff, AttackTarget, Chance, MoveTo, Patrol,
    SeekHighGround, SetDecision, TakeCover, Wait,
};
use rts_ai_bt::{ActionNode, BtNode, Inverter, Selector, Sequence};
use rts_ai_core::{BbValue, UnitId};
use rts_ai_runtime::Registry;

pub const SKIRMISHER: &str = "skirmisher";
pub const DEFENDER: &str = "defender";
pub const SUPPORT: &str = "support";

pub fn register_stock_trees(registry: &mut Registry) {
    registry.register_tree_type(SKIRMISHER, skirmisher);
    registry.register_tree_type(DEFENDER, defender);
    registry.register_tree_type(SUPPORT, support);
}

fn node(n: impl BtNode + 'static) -> Box<dyn BtNode> {
    Box::new(n)
}

fn patrol_route() -> Box<dyn BtNode> {
    node(Sequence::new(
        "patrol",
        vec![
            node(ActionNode::new("next_waypoint", Patrol)),
            node(ActionNode::new("linger", Wait::jittered(0, 3))),
            node(ActionNode::new("walk", MoveTo::default())),
        ],
    ))
}

/// Engage anything within reach, otherwise walk the patrol route.
pub fn skirmisher(_unit: UnitId) -> Box<dyn BtNode> {
    node(Selector::new(
        "skirmisher",
        vec![
            node(Sequence::new(
                "engage",
                vec![
                    node(enemy_in_range(8.0)),
                    node(ActionNode::new("acquire", AcquireTarget { radius: 8.0 })),
                    node(ActionNode::new("attack", AttackTarget)),
                ],
            )),
            patrol_route(),
        ],
    ))
}

/// Fall back behind cover when threatened, hold high ground when calm.
pub fn defender(_unit: UnitId) -> Box<dyn BtNode> {
    node(Selector::new(
        "defender",
        vec![
            node(Sequence::new(
                "fall_back",
                vec![
                    node(ActionNode::new("acquire", AcquireTarget { radius: 10.0 })),
                    node(ActionNode::new("cover", TakeCover)),
                    node(ActionNode::new("retreat", MoveTo::default())),
                ],
            )),
            node(Sequence::new(
                "hold",
                vec![
                    node(Inverter::new("calm", node(enemy_in_range(4.0)))),
                    node(ActionNode::new("find_hill", SeekHighGround { radius: 25.0 })),
                    node(ActionNode::new("climb", MoveTo::default())),
                ],
            )),
            node(ActionNode::new(
                "hold_position",
                SetDecision {
                    decision: BbValue::from("hold"),
                },
            )),
        ],
    ))
}

/// Occasionally rally nearby allies; patrol in between.
pub fn support(_unit: UnitId) -> Box<dyn BtNode> {
    node(Selector::new(
        "support",
        vec![
            node(Sequence::new(
                "rally",
                vec![
                    node(ActionNode::new("roll", Chance { probability: 0.2 })),
                    node(ActionNode::new(
                        "buff",
                        ApplyBuff {
                            buff: "rally".into(),
                        },
                    )),
                    node(ActionNode::new(
                        "announce",
                        SetDecision {
                            decision: BbValue::from("rally"),
                        },
                    )),
                ],
            )),
            patrol_route(),
        ],
    ))
}
