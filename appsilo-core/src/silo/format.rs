//! Binary silo codec
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ magic: b"APSL"              (4 bytes)    │
//! │ format version: u16 LE      (2 bytes)    │
//! │ reserved: u16               (2 bytes)    │
//! │ payload length: u64 LE      (8 bytes)    │
//! │ sha256(payload)             (32 bytes)   │
//! ├──────────────────────────────────────────┤
//! │ payload: bincode(WirePayload)            │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The node tree is stored flat in breadth-first order: components first,
//! then every node's children as one contiguous run. Decoding checks the
//! layout and the nesting depth before any tree is rebuilt, so a hostile
//! blob cannot recurse the decoder.
//!
//! Every decoding failure is reported as [`CatalogError::CorruptIndex`].

use bincode::Options;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Node;
use crate::error::{CatalogError, Result};

/// Leading bytes of every silo
pub const MAGIC: &[u8; 4] = b"APSL";

/// Current on-disk format version
pub const FORMAT_VERSION: u16 = 2;

/// Deepest nesting accepted below a component node
pub const MAX_DEPTH: usize = 64;

const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = 4 + 2 + 2 + 8 + DIGEST_LEN;

/// Decoded silo contents
#[derive(Debug, Clone, Default)]
pub(crate) struct SiloPayload {
    /// Build time, unix seconds
    pub built_at: i64,
    /// Label of the catalog source the silo was compiled from
    pub origin: Option<String>,
    /// Component nodes in document order
    pub components: Vec<Node>,
}

#[derive(Serialize, Deserialize)]
struct FlatNode {
    element: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    first_child: u32,
    child_count: u32,
}

#[derive(Serialize, Deserialize)]
struct WirePayload {
    built_at: i64,
    origin: Option<String>,
    /// The first `roots` entries of `nodes` are the components
    roots: u32,
    nodes: Vec<FlatNode>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

fn index(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| CatalogError::malformed("silo exceeds u32 node indices"))
}

fn flatten(payload: &SiloPayload) -> Result<WirePayload> {
    let mut order: Vec<&Node> = payload.components.iter().collect();
    let mut nodes = Vec::with_capacity(order.len());
    let mut next = 0;
    while let Some(&node) = order.get(next) {
        let first_child = index(order.len())?;
        order.extend(node.children());
        nodes.push(FlatNode {
            element: node.element.clone(),
            attrs: node.attrs.clone(),
            text: node.text.clone(),
            first_child,
            child_count: index(node.children().len())?,
        });
        next += 1;
    }
    Ok(WirePayload {
        built_at: payload.built_at,
        origin: payload.origin.clone(),
        roots: index(payload.components.len())?,
        nodes,
    })
}

/// Check the breadth-first layout: every node is reached exactly once,
/// children always follow their parent and no branch is deeper than
/// [`MAX_DEPTH`]
fn validate(wire: &WirePayload) -> Result<()> {
    let len = wire.nodes.len();
    let roots = wire.roots as usize;
    if roots > len {
        return Err(CatalogError::corrupt(format!(
            "{roots} components declared, only {len} nodes present"
        )));
    }

    let mut depth = vec![0usize; len];
    let mut expected = roots;
    for (idx, node) in wire.nodes.iter().enumerate() {
        if idx >= expected {
            return Err(CatalogError::corrupt(format!("node {idx} is unreachable")));
        }
        let count = node.child_count as usize;
        if count == 0 {
            continue;
        }
        if node.first_child as usize != expected {
            return Err(CatalogError::corrupt(format!(
                "node {idx} children start at {}, expected {expected}",
                node.first_child
            )));
        }
        let end = expected
            .checked_add(count)
            .filter(|end| *end <= len)
            .ok_or_else(|| CatalogError::corrupt(format!("node {idx} children out of range")))?;
        let child_depth = depth[idx] + 1;
        if child_depth > MAX_DEPTH {
            return Err(CatalogError::corrupt(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        depth[expected..end].fill(child_depth);
        expected = end;
    }
    if expected != len {
        return Err(CatalogError::corrupt(format!(
            "{} trailing nodes are unreachable",
            len - expected
        )));
    }
    Ok(())
}

/// Rebuild the tree bottom-up; children always sit after their parent
fn unflatten(wire: WirePayload) -> Result<SiloPayload> {
    validate(&wire)?;
    let roots = wire.roots as usize;
    let mut built: Vec<Option<Node>> = Vec::with_capacity(wire.nodes.len());
    built.resize_with(wire.nodes.len(), || None);

    for (idx, flat) in wire.nodes.into_iter().enumerate().rev() {
        let first = flat.first_child as usize;
        let children = (first..first + flat.child_count as usize)
            .map(|child| built[child].take())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CatalogError::corrupt(format!("node {idx} shares a child")))?;
        built[idx] = Some(Node::from_parts(flat.element, flat.attrs, flat.text, children));
    }

    let components = built
        .into_iter()
        .take(roots)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CatalogError::corrupt("component missing after rebuild"))?;
    Ok(SiloPayload {
        built_at: wire.built_at,
        origin: wire.origin,
        components,
    })
}

/// Serialize a payload with header and checksum
pub(crate) fn encode(payload: &SiloPayload) -> Result<Vec<u8>> {
    let wire = flatten(payload)?;
    let body = options().serialize(&wire).map_err(CatalogError::Encode)?;
    let digest = Sha256::digest(&body);

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&digest);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Validate and decode a silo blob, returning the payload and its hex checksum
pub(crate) fn decode(bytes: &[u8]) -> Result<(SiloPayload, String)> {
    if bytes.len() < HEADER_LEN {
        return Err(CatalogError::corrupt(format!(
            "truncated header: {} bytes, need {HEADER_LEN}",
            bytes.len()
        )));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);

    if &header[0..4] != MAGIC {
        return Err(CatalogError::corrupt("bad magic"));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(CatalogError::corrupt(format!(
            "unsupported format version {version}"
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[8..16]);
    let declared = u64::from_le_bytes(len_bytes);
    if declared != body.len() as u64 {
        return Err(CatalogError::corrupt(format!(
            "payload length mismatch: header says {declared}, found {}",
            body.len()
        )));
    }

    let digest = Sha256::digest(body);
    if digest.as_slice() != &header[16..HEADER_LEN] {
        return Err(CatalogError::corrupt("checksum mismatch"));
    }

    let wire: WirePayload = options()
        .with_limit(declared)
        .deserialize(body)
        .map_err(|e| CatalogError::corrupt(format!("payload decode failed: {e}")))?;

    Ok((unflatten(wire)?, hex::encode(digest)))
}
