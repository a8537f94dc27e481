use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use super::model::Model;
use crate::gfx::transform::Transform;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene already contains an object named '{0}'")]
    DuplicateIdentifier(String),
    #[error("no object named '{0}' in scene")]
    NotFound(String),
}

/// One placed object: an identifier, a shared model and its own transform.
#[derive(Debug, Clone)]
pub struct SceneEntry {
    id: String,
    pub model: Arc<Model>,
    pub transform: Transform,
}

impl SceneEntry {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Flat, insertion-ordered collection of renderable objects.
///
/// The scene owns the identifier -> (model, transform) mapping but only
/// shares the models. Traversal order is insertion order; removing an entry
/// keeps the remaining entries in their original relative order. No depth
/// sorting is performed.
///
/// [`Scene::iter`] borrows the scene immutably, so adding, removing or
/// mutating objects while a traversal is in progress is rejected at compile
/// time. Mutate between frames instead.
#[derive(Debug, Default)]
pub struct Scene {
    entries: Vec<SceneEntry>,
    index: HashMap<String, usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an object at the end of traversal order.
    pub fn add(&mut self, id: &str, model: Arc<Model>, transform: Transform) -> Result<(), SceneError> {
        if self.index.contains_key(id) {
            return Err(SceneError::DuplicateIdentifier(id.to_string()));
        }

        self.index.insert(id.to_string(), self.entries.len());
        self.entries.push(SceneEntry {
            id: id.to_string(),
            model,
            transform,
        });
        Ok(())
    }

    /// Removes an object, returning its model and last transform.
    pub fn remove(&mut self, id: &str) -> Result<(Arc<Model>, Transform), SceneError> {
        let position = self
            .index
            .remove(id)
            .ok_or_else(|| SceneError::NotFound(id.to_string()))?;

        let entry = self.entries.remove(position);
        for later in &self.entries[position..] {
            if let Some(slot) = self.index.get_mut(&later.id) {
                *slot -= 1;
            }
        }

        Ok((entry.model, entry.transform))
    }

    pub fn get(&self, id: &str) -> Result<&SceneEntry, SceneError> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| SceneError::NotFound(id.to_string()))
    }

    /// Mutable access; changes are seen by the next traversal.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut SceneEntry, SceneError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(SceneError::NotFound(id.to_string())),
        }
    }

    pub fn transform_mut(&mut self, id: &str) -> Result<&mut Transform, SceneError> {
        self.get_mut(id).map(|entry| &mut entry.transform)
    }

    /// Entries in insertion order. Restartable; each call starts over.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Model>, &Transform)> {
        self.entries
            .iter()
            .map(|entry| (entry.id.as_str(), &entry.model, &entry.transform))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Gets statistics about the scene
    pub fn statistics(&self) -> SceneStatistics {
        let (total_vertices, total_triangles) =
            self.entries.iter().fold((0, 0), |(vertices, triangles), entry| {
                let mesh = entry.model.mesh();
                (
                    vertices + mesh.vertices().len(),
                    triangles + mesh.triangle_count(),
                )
            });

        SceneStatistics {
            object_count: self.entries.len(),
            total_vertices,
            total_triangles,
        }
    }
}

/// Scene statistics for debugging and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
}
