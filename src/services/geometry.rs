//! Geometry resolution for positioned elements.
//!
//! Turns the sizing specifications of one `ViewData` into concrete pixel
//! rectangles for a given viewport. Percentage sizes may reference other
//! elements by id, so elements are resolved in dependency order. The walk is
//! an iterative form of Tarjan's strongly connected components algorithm (no
//! recursion, so long reference chains in an untrusted manifest cannot exhaust
//! the stack); components come out dependencies first, and every member of a
//! cyclic component is reported as a cycle.
//!
//! Failures are local: an element on a cycle, with a dangling reference, with
//! malformed sizing, or depending on any of those gets a zero-size,
//! non-renderable fallback and a [`GeometryError`]. Every other element is
//! resolved normally.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    BaseInfo, ControllerLayout, GroupVisibility, Reference, SizeSpec, ViewData, VisibilityType,
};

/// Concrete geometry of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedElement {
    /// Left edge in device pixels
    pub x: f64,
    /// Top edge in device pixels
    pub y: f64,
    /// Width in device pixels
    pub width: f64,
    /// Height in device pixels
    pub height: f64,
    /// Declared visibility
    pub visibility: VisibilityType,
    /// False for hidden elements and for resolution fallbacks
    pub renderable: bool,
}

impl ResolvedElement {
    fn fallback(info: &BaseInfo) -> Self {
        Self {
            x: f64::from(info.x_position),
            y: f64::from(info.y_position),
            width: 0.0,
            height: 0.0,
            visibility: info.visibility.clone(),
            renderable: false,
        }
    }
}

/// Why an element could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometryErrorKind {
    /// The element is part of a reference cycle (path starts and ends on the same id)
    Cycle { path: Vec<String> },
    /// The element references an id that does not exist in the same view data
    DanglingReference { reference: String },
    /// The element references an element that itself failed to resolve
    UnresolvedDependency { reference: String },
    /// The element's sizing specification is malformed
    InvalidSizing,
    /// Another element already uses this id; only the first one is resolved
    DuplicateId,
}

/// Non-fatal resolution failure of a single element.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("element '{element}': {}", describe(.kind))]
pub struct GeometryError {
    /// Id of the element that fell back
    pub element: String,
    /// What went wrong
    #[serde(flatten)]
    pub kind: GeometryErrorKind,
}

fn describe(kind: &GeometryErrorKind) -> String {
    match kind {
        GeometryErrorKind::Cycle { path } => format!("reference cycle {}", path.join(" -> ")),
        GeometryErrorKind::DanglingReference { reference } => {
            format!("dangling reference '{reference}'")
        }
        GeometryErrorKind::UnresolvedDependency { reference } => {
            format!("depends on unresolved element '{reference}'")
        }
        GeometryErrorKind::InvalidSizing => "invalid sizing".to_string(),
        GeometryErrorKind::DuplicateId => "duplicate element id".to_string(),
    }
}

/// Result of resolving one `ViewData`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Resolution {
    /// Rectangle per element id (fallbacks included)
    pub elements: BTreeMap<String, ResolvedElement>,
    /// Elements that fell back, in the order they were finalized
    pub errors: Vec<GeometryError>,
}

impl Resolution {
    /// Looks up an element's rectangle.
    pub fn get(&self, id: &str) -> Option<&ResolvedElement> {
        self.elements.get(id)
    }

    /// Returns the error recorded for `id`, if it fell back.
    pub fn error_for(&self, id: &str) -> Option<&GeometryError> {
        self.errors.iter().find(|e| e.element == id)
    }

    /// Returns true if every element resolved without falling back.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolution of one view group of a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResolution {
    /// View group id
    pub group_id: String,
    /// Layer visibility of the group
    pub visibility: GroupVisibility,
    /// Element rectangles of the group
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Width,
    Height,
}

/// Resolves every element of `view_data` against a viewport.
pub fn resolve(view_data: &ViewData, viewport_width: f64, viewport_height: f64) -> Resolution {
    Resolver::new(view_data, viewport_width, viewport_height).run()
}

/// Resolves every view group of `layout`.
pub fn resolve_layout(
    layout: &ControllerLayout,
    viewport_width: f64,
    viewport_height: f64,
) -> Vec<GroupResolution> {
    layout
        .view_groups
        .iter()
        .map(|group| GroupResolution {
            group_id: group.id.clone(),
            visibility: group.visibility,
            resolution: resolve(&group.view_data, viewport_width, viewport_height),
        })
        .collect()
}

struct Resolver<'a> {
    viewport: (f64, f64),
    /// Element ids in declaration order, first occurrence only
    order: Vec<&'a str>,
    specs: HashMap<&'a str, &'a BaseInfo>,
    /// Discovery index and low-link per visited element
    links: HashMap<&'a str, (usize, usize)>,
    /// Visited elements whose component is not yet complete
    pending: Vec<&'a str>,
    on_pending: HashSet<&'a str>,
    /// Elements found on a cycle, with a cycle path through each
    on_cycle: HashMap<&'a str, Vec<String>>,
    sizes: HashMap<&'a str, (f64, f64)>,
    resolution: Resolution,
}

impl<'a> Resolver<'a> {
    fn new(view_data: &'a ViewData, viewport_width: f64, viewport_height: f64) -> Self {
        let mut order = Vec::new();
        let mut specs = HashMap::new();
        let mut resolution = Resolution::default();

        for (id, info) in view_data.elements() {
            if specs.contains_key(id) {
                resolution.errors.push(GeometryError {
                    element: id.to_string(),
                    kind: GeometryErrorKind::DuplicateId,
                });
                continue;
            }
            specs.insert(id, info);
            order.push(id);
        }

        Self {
            viewport: (viewport_width, viewport_height),
            order,
            specs,
            links: HashMap::new(),
            pending: Vec::new(),
            on_pending: HashSet::new(),
            on_cycle: HashMap::new(),
            sizes: HashMap::new(),
            resolution,
        }
    }

    fn run(mut self) -> Resolution {
        for root in self.order.clone() {
            if self.links.contains_key(root) {
                continue;
            }
            self.walk(root);
        }
        self.resolution
    }

    fn dependencies(&self, id: &str) -> Vec<&'a str> {
        self.specs
            .get(id)
            .map(|info| info.size.element_references())
            .unwrap_or_default()
    }

    /// Depth-first walk from `root`, finalizing each component after the
    /// components it depends on.
    fn walk(&mut self, root: &'a str) {
        // (element, dependencies, next dependency index)
        let mut stack: Vec<(&'a str, Vec<&'a str>, usize)> = Vec::new();
        self.visit(root, &mut stack);

        while let Some((node, deps, next)) = stack.last_mut() {
            let node = *node;
            if *next < deps.len() {
                let dep = deps[*next];
                *next += 1;

                if !self.specs.contains_key(dep) {
                    // Reported when `node` is finalized
                    continue;
                }

                match self.links.get(dep).map(|&(index, _)| index) {
                    None => self.visit(dep, &mut stack),
                    Some(index) if self.on_pending.contains(dep) => self.lower_link(node, index),
                    Some(_) => {}
                }
            } else {
                stack.pop();
                let Some(&(index, low)) = self.links.get(node) else {
                    continue;
                };
                if let Some((parent, _, _)) = stack.last() {
                    self.lower_link(parent, low);
                }
                if index == low {
                    self.complete_component(node);
                }
            }
        }
    }

    fn visit(&mut self, id: &'a str, stack: &mut Vec<(&'a str, Vec<&'a str>, usize)>) {
        let index = self.links.len();
        self.links.insert(id, (index, index));
        self.pending.push(id);
        self.on_pending.insert(id);
        stack.push((id, self.dependencies(id), 0));
    }

    fn lower_link(&mut self, id: &str, candidate: usize) {
        if let Some((_, low)) = self.links.get_mut(id) {
            *low = (*low).min(candidate);
        }
    }

    /// Pops the component rooted at `root` and finalizes its members.
    fn complete_component(&mut self, root: &'a str) {
        let mut members = Vec::new();
        while let Some(id) = self.pending.pop() {
            self.on_pending.remove(id);
            members.push(id);
            if id == root {
                break;
            }
        }
        members.reverse();

        let cyclic = members.len() > 1 || self.dependencies(root).contains(&root);
        if cyclic {
            let component: HashSet<&'a str> = members.iter().copied().collect();
            for &id in &members {
                let path = self.cycle_through(id, &component);
                self.on_cycle.insert(id, path);
            }
        }

        for id in members {
            self.finalize(id);
        }
    }

    /// Shortest reference path from `start` back to itself inside `component`.
    fn cycle_through(&self, start: &'a str, component: &HashSet<&'a str>) -> Vec<String> {
        let mut parent: HashMap<&'a str, &'a str> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for dep in self.dependencies(node) {
                if !component.contains(dep) {
                    continue;
                }
                if dep == start {
                    let mut path = vec![node];
                    let mut current = node;
                    while current != start {
                        match parent.get(current) {
                            Some(&previous) => {
                                current = previous;
                                path.push(current);
                            }
                            None => break,
                        }
                    }
                    path.reverse();
                    path.push(start);
                    return path.into_iter().map(str::to_string).collect();
                }
                if !parent.contains_key(dep) {
                    parent.insert(dep, node);
                    queue.push_back(dep);
                }
            }
        }

        vec![start.to_string(), start.to_string()]
    }

    fn finalize(&mut self, id: &'a str) {
        let Some(info) = self.specs.get(id).copied() else {
            return;
        };

        match self.compute(id, info) {
            Ok((width, height)) => {
                self.sizes.insert(id, (width, height));
                self.resolution.elements.insert(
                    id.to_string(),
                    ResolvedElement {
                        x: f64::from(info.x_position),
                        y: f64::from(info.y_position),
                        width,
                        height,
                        visibility: info.visibility.clone(),
                        renderable: info.visibility.is_renderable(),
                    },
                );
            }
            Err(kind) => {
                debug!(element = id, ?kind, "geometry fallback");
                self.resolution
                    .elements
                    .insert(id.to_string(), ResolvedElement::fallback(info));
                self.resolution.errors.push(GeometryError {
                    element: id.to_string(),
                    kind,
                });
            }
        }
    }

    fn compute(&self, id: &str, info: &BaseInfo) -> Result<(f64, f64), GeometryErrorKind> {
        if let Some(path) = self.on_cycle.get(id) {
            return Err(GeometryErrorKind::Cycle { path: path.clone() });
        }

        match &info.size {
            SizeSpec::Absolute { width, height } => Ok((*width, *height)),
            SizeSpec::Percentage { width, height } => {
                let w = self.dimension(&width.reference, Axis::Width)? * width.size;
                let h = self.dimension(&height.reference, Axis::Height)? * height.size;
                Ok((w, h))
            }
            SizeSpec::Malformed(_) => Err(GeometryErrorKind::InvalidSizing),
        }
    }

    fn dimension(&self, reference: &Reference, axis: Axis) -> Result<f64, GeometryErrorKind> {
        match reference {
            Reference::ScreenWidth => Ok(self.viewport.0),
            Reference::ScreenHeight => Ok(self.viewport.1),
            Reference::Element(target) => {
                if !self.specs.contains_key(target.as_str()) {
                    return Err(GeometryErrorKind::DanglingReference {
                        reference: target.clone(),
                    });
                }
                match self.sizes.get(target.as_str()) {
                    Some((w, h)) => Ok(match axis {
                        Axis::Width => *w,
                        Axis::Height => *h,
                    }),
                    None => Err(GeometryErrorKind::UnresolvedDependency {
                        reference: target.clone(),
                    }),
                }
            }
        }
    }
}
