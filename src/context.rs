//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG context.

use crate::error::{Error, Result};
use crate::iter::SchemaModules;
use crate::schema::{LeafType, SchemaModule, SchemaNodeData};

/// Handle to a module stored in a [`Context`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ModuleId(pub(crate) u32);

/// Handle to a submodule stored in a [`Context`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubmoduleId(pub(crate) u32);

/// Handle to a schema node stored in a [`Context`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SchemaNodeId(pub(crate) u32);

/// Context of the YANG schemas.
///
/// The context owns all schema modules and schema nodes in flat arenas
/// addressed by integer handles, so node identity is stable for the whole
/// lifetime of the context. Data trees borrow the context and must not
/// outlive it.
///
/// Unlike a full YANG implementation, schemas are defined programmatically
/// (see the `new_*` constructors here and in the schema module); parsing
/// YANG text is the job of an external loader.
#[derive(Debug, Default)]
pub struct Context {
    pub(crate) modules: Vec<ModuleData>,
    pub(crate) submodules: Vec<SubmoduleData>,
    pub(crate) snodes: Vec<SchemaNodeData>,
}

#[derive(Debug)]
pub(crate) struct ModuleData {
    pub name: String,
    pub revision: Option<String>,
    pub namespace: String,
    pub implemented: bool,
    // Top-level schema nodes attached to this module's tree.
    pub first_node: Option<SchemaNodeId>,
    pub last_node: Option<SchemaNodeId>,
    // Targets of this module's augments (nodes in other modules).
    pub augments: Vec<SchemaNodeId>,
    // Original nodes of this module's deviations.
    pub deviations: Vec<SchemaNodeId>,
    pub submodules: Vec<SubmoduleId>,
    pub annotations: Vec<AnnotationData>,
}

#[derive(Debug)]
pub(crate) struct SubmoduleData {
    pub module: ModuleId,
    pub name: String,
    pub augments: Vec<SchemaNodeId>,
    pub deviations: Vec<SchemaNodeId>,
}

/// Metadata annotation definition (RFC 7952).
#[derive(Debug)]
pub(crate) struct AnnotationData {
    pub name: String,
    pub vtype: LeafType,
}

// ===== impl Context =====

impl Context {
    /// Create an empty context.
    ///
    /// The context is used to hold all information about schemas. Usually,
    /// the application is supposed to work with a single context according
    /// to which all data trees are built and serialized.
    pub fn new() -> Context {
        Context::default()
    }

    /// Define a new module. The revision, when given, must be a `YYYY-MM-DD`
    /// date. Duplicate name+revision pairs are rejected.
    pub fn new_module(
        &mut self,
        name: &str,
        revision: Option<&str>,
        namespace: &str,
    ) -> Result<ModuleId> {
        if name.is_empty() {
            return Err(Error::invalid_argument("empty module name"));
        }
        if let Some(rev) = revision {
            if !is_valid_revision(rev) {
                return Err(Error::invalid_argument(format!(
                    "invalid revision date \"{}\"",
                    rev
                )));
            }
        }
        if self
            .modules
            .iter()
            .any(|m| m.name == name && m.revision.as_deref() == revision)
        {
            return Err(Error::invalid_argument(format!(
                "module \"{}\" already defined",
                name
            )));
        }

        self.modules.push(ModuleData {
            name: name.to_string(),
            revision: revision.map(str::to_string),
            namespace: namespace.to_string(),
            implemented: true,
            first_node: None,
            last_node: None,
            augments: Vec::new(),
            deviations: Vec::new(),
            submodules: Vec::new(),
            annotations: Vec::new(),
        });
        Ok(ModuleId(self.modules.len() as u32 - 1))
    }

    /// Register a submodule of an existing module.
    pub fn new_submodule(
        &mut self,
        module: ModuleId,
        name: &str,
    ) -> Result<SubmoduleId> {
        self.check_module(module)?;
        self.submodules.push(SubmoduleData {
            module,
            name: name.to_string(),
            augments: Vec::new(),
            deviations: Vec::new(),
        });
        let id = SubmoduleId(self.submodules.len() as u32 - 1);
        self.modules[module.0 as usize].submodules.push(id);
        Ok(id)
    }

    /// Record that `module` augments the subtree rooted at `target`. Nodes
    /// the augment adds are created afterwards with `target` as their parent
    /// and `module` as their defining module.
    pub fn new_augment(
        &mut self,
        module: ModuleId,
        target: SchemaNodeId,
    ) -> Result<()> {
        self.check_module(module)?;
        self.check_snode(target)?;
        self.modules[module.0 as usize].augments.push(target);
        Ok(())
    }

    /// Record that `submodule` augments the subtree rooted at `target`.
    pub fn new_submodule_augment(
        &mut self,
        submodule: SubmoduleId,
        target: SchemaNodeId,
    ) -> Result<()> {
        self.check_snode(target)?;
        self.submodules
            .get_mut(submodule.0 as usize)
            .ok_or_else(|| Error::invalid_argument("unknown submodule"))?
            .augments
            .push(target);
        Ok(())
    }

    /// Record that `module` deviates the node `orig`.
    pub fn new_deviation(
        &mut self,
        module: ModuleId,
        orig: SchemaNodeId,
    ) -> Result<()> {
        self.check_module(module)?;
        self.check_snode(orig)?;
        self.modules[module.0 as usize].deviations.push(orig);
        Ok(())
    }

    /// Record that `submodule` deviates the node `orig`.
    pub fn new_submodule_deviation(
        &mut self,
        submodule: SubmoduleId,
        orig: SchemaNodeId,
    ) -> Result<()> {
        self.check_snode(orig)?;
        self.submodules
            .get_mut(submodule.0 as usize)
            .ok_or_else(|| Error::invalid_argument("unknown submodule"))?
            .deviations
            .push(orig);
        Ok(())
    }

    /// Define a metadata annotation (RFC 7952) in the given module.
    pub fn new_annotation(
        &mut self,
        module: ModuleId,
        name: &str,
        vtype: LeafType,
    ) -> Result<()> {
        self.check_module(module)?;
        let annotations = &mut self.modules[module.0 as usize].annotations;
        if annotations.iter().any(|a| a.name == name) {
            return Err(Error::invalid_argument(format!(
                "annotation \"{}\" already defined",
                name
            )));
        }
        annotations.push(AnnotationData {
            name: name.to_string(),
            vtype,
        });
        Ok(())
    }

    /// Change whether the module counts as implemented. Only implemented
    /// modules participate in the augment/deviation closure when the set of
    /// serialized modules is computed.
    pub fn set_implemented(
        &mut self,
        module: ModuleId,
        implemented: bool,
    ) -> Result<()> {
        self.check_module(module)?;
        self.modules[module.0 as usize].implemented = implemented;
        Ok(())
    }

    /// Get a module by name and optional revision. With a `None` revision
    /// the latest revision of the module is returned.
    pub fn get_module(
        &self,
        name: &str,
        revision: Option<&str>,
    ) -> Option<SchemaModule<'_>> {
        let mut found: Option<usize> = None;
        for (idx, module) in self.modules.iter().enumerate() {
            if module.name != name {
                continue;
            }
            match revision {
                Some(rev) => {
                    if module.revision.as_deref() == Some(rev) {
                        return Some(SchemaModule::new(
                            self,
                            ModuleId(idx as u32),
                        ));
                    }
                }
                None => match found {
                    Some(prev)
                        if self.modules[prev].revision
                            >= module.revision => {}
                    _ => found = Some(idx),
                },
            }
        }
        found.map(|idx| SchemaModule::new(self, ModuleId(idx as u32)))
    }

    /// Iterate over all modules in definition order.
    pub fn modules(&self) -> SchemaModules<'_> {
        SchemaModules::new(self)
    }

    pub(crate) fn check_module(&self, module: ModuleId) -> Result<()> {
        if (module.0 as usize) < self.modules.len() {
            Ok(())
        } else {
            Err(Error::invalid_argument("unknown module"))
        }
    }

    pub(crate) fn check_snode(&self, snode: SchemaNodeId) -> Result<()> {
        if (snode.0 as usize) < self.snodes.len() {
            Ok(())
        } else {
            Err(Error::invalid_argument("unknown schema node"))
        }
    }

    pub(crate) fn module(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id.0 as usize]
    }

    pub(crate) fn snode(&self, id: SchemaNodeId) -> &SchemaNodeData {
        &self.snodes[id.0 as usize]
    }
}

fn is_valid_revision(rev: &str) -> bool {
    let bytes = rev.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| {
        bytes[range].iter().all(u8::is_ascii_digit)
    };
    if !digits(0..4) || !digits(5..7) || !digits(8..10) {
        return false;
    }
    let month: u8 = rev[5..7].parse().unwrap_or(0);
    let day: u8 = rev[8..10].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}
