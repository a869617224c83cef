//! Common component types used across benchmarks.
//!
//! These components are designed to be representative of real extension data
//! in terms of size and codec cost.

use latch::component::Component;
use latch::tag::{Compound, Tag};

/// Small numeric component (4 bytes of state).
#[derive(Clone, Copy, Debug, Default)]
pub struct Health {
    pub value: i32,
}

impl Component for Health {
    fn save(&self) -> Tag {
        Tag::Int(self.value)
    }

    fn load(&mut self, tag: &Tag) {
        if let Some(value) = tag.as_int() {
            self.value = value;
        }
    }
}

/// Mid-sized component with a compound payload (position plus velocity).
#[derive(Clone, Copy, Debug, Default)]
pub struct Motion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub speed: f64,
}

impl Component for Motion {
    fn save(&self) -> Tag {
        let mut out = Compound::new();
        out.insert("x", Tag::Double(self.x));
        out.insert("y", Tag::Double(self.y));
        out.insert("z", Tag::Double(self.z));
        out.insert("speed", Tag::Double(self.speed));
        Tag::Compound(out)
    }

    fn load(&mut self, tag: &Tag) {
        let Some(compound) = tag.as_compound() else {
            return;
        };
        for (key, field) in [
            ("x", &mut self.x),
            ("y", &mut self.y),
            ("z", &mut self.z),
            ("speed", &mut self.speed),
        ] {
            if let Some(Tag::Double(value)) = compound.get(key) {
                *field = *value;
            }
        }
    }
}

/// String-heavy component, the expensive end of codec cost.
#[derive(Clone, Debug, Default)]
pub struct Dialogue {
    pub lines: Vec<String>,
}

impl Component for Dialogue {
    fn save(&self) -> Tag {
        Tag::List(self.lines.iter().map(|line| Tag::String(line.clone())).collect())
    }

    fn load(&mut self, tag: &Tag) {
        if let Some(items) = tag.as_list() {
            self.lines = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect();
        }
    }
}
