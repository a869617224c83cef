//! Canonical serialization of container contents.
//!
//! Encoding is strict: every stored component is written, in container
//! iteration order, as a `{ "id", "data" }` compound under the
//! [`COMPONENTS_KEY`] list. Decoding is tolerant: entries whose identifier no
//! longer resolves, or resolves to a kind the container has no slot for, are
//! skipped silently. Old data read by a newer registry must never corrupt or
//! crash; components from absent modules simply vanish. That asymmetry is
//! deliberate and load-bearing for forward compatibility.

use crate::component::{Identifier, Registry};
use crate::container::Container;
use crate::tag::{Compound, Tag};

/// Key under which a container's component list is written.
pub const COMPONENTS_KEY: &str = "components";

/// Key of a component entry's identifier string.
const ID_KEY: &str = "id";

/// Key of a component entry's serialized payload.
const DATA_KEY: &str = "data";

/// Encode a container's contents into the given compound.
///
/// An empty container writes nothing at all, not even an empty list marker.
pub fn encode(container: &dyn Container, out: &mut Compound) {
    if container.is_empty() {
        return;
    }

    let mut entries = Vec::with_capacity(container.len());
    container.for_each(&mut |kind, component| {
        let mut entry = Compound::new();
        entry.insert(ID_KEY, kind.id().as_str());
        entry.insert(DATA_KEY, component.save());
        entries.push(Tag::Compound(entry));
    });
    out.insert(COMPONENTS_KEY, Tag::List(entries));
}

/// Decode previously encoded component payloads into a container, in place.
///
/// Total for any input: entries that cannot be applied are skipped, entries
/// that can are delegated to the component's own
/// [`load`](crate::component::Component::load). Keys other than
/// [`COMPONENTS_KEY`] are never touched.
pub fn decode(container: &mut dyn Container, registry: &Registry, tag: &Compound) {
    let Some(entries) = tag.get(COMPONENTS_KEY).and_then(Tag::as_list) else {
        return;
    };

    for entry in entries {
        let Some(entry) = entry.as_compound() else {
            log::trace!("skipping non-compound component entry");
            continue;
        };
        let Some(raw_id) = entry.get(ID_KEY).and_then(Tag::as_str) else {
            log::trace!("skipping component entry without an id");
            continue;
        };
        let Ok(id) = Identifier::new(raw_id) else {
            log::trace!("skipping component entry with malformed id '{raw_id}'");
            continue;
        };
        // Module absent or version skew: the kind no longer exists.
        let Some(kind) = registry.get(&id) else {
            log::trace!("skipping component entry for unregistered kind '{id}'");
            continue;
        };
        // The holder does not carry this kind; unrelated entries still apply.
        let Some(component) = container.get_mut(&kind) else {
            log::trace!("skipping component entry '{id}': container has no slot");
            continue;
        };
        if let Some(data) = entry.get(DATA_KEY) {
            component.load(data);
        }
    }
}
