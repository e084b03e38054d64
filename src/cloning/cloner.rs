use log::{debug, trace, warn};

use crate::{
    cloning::{closure::CloneClosure, context::CloneContext, CloneOptions, CloneResult},
    metadata::{
        members::{
            CustomAttribute, EventDef, FieldDef, GenericParam, MethodDef, ParamDef, PropertyDef,
            TypeDef,
        },
        module::{MemberHandle, Module},
        tables::TableId,
        token::Token,
    },
    Error::{EmptySeedSet, InvalidSeedModule},
    Result,
};

/// Copies members of one module into another.
///
/// The cloner is a one-shot builder: seed members are added with [`MetadataCloner::include`] and
/// [`MetadataCloner::include_all`], then [`MetadataCloner::clone_members`] performs the copy.
///
/// Every seed is cloned together with everything structurally nested in it. References to
/// members outside that set are imported as `TypeRef`, `MemberRef`, `TypeSpec`, `MethodSpec`,
/// `AssemblyRef` and `ModuleRef` rows of the target, reusing equivalent rows the target already
/// holds.
///
/// # Examples
///
/// ```rust
/// use dotgraft::cloning::MetadataCloner;
/// use dotgraft::metadata::members::TypeDef;
/// use dotgraft::metadata::module::Module;
///
/// let mut source = Module::new("Source.dll");
/// let widget = source.add_type_def(TypeDef {
///     namespace: "Library".to_string(),
///     name: "Widget".to_string(),
///     ..TypeDef::default()
/// });
///
/// let mut target = Module::new("Target.dll");
/// let result = MetadataCloner::new(&source, &mut target)
///     .include(source.handle(widget)?)
///     .clone_members()?;
///
/// for token in result.cloned_top_level_types() {
///     target.attach_top_level_type(*token)?;
/// }
/// assert!(target.find_type("Library", "Widget").is_some());
/// # Ok::<(), dotgraft::Error>(())
/// ```
pub struct MetadataCloner<'s, 't> {
    source: &'s Module,
    target: &'t mut Module,
    seeds: Vec<MemberHandle>,
    options: CloneOptions,
}

impl<'s, 't> MetadataCloner<'s, 't> {
    /// Create a cloner copying from `source` into `target`.
    #[must_use]
    pub fn new(source: &'s Module, target: &'t mut Module) -> Self {
        MetadataCloner {
            source,
            target,
            seeds: Vec::new(),
            options: CloneOptions::default(),
        }
    }

    /// Replace the options of this run.
    #[must_use]
    pub fn with_options(mut self, options: CloneOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a seed member.
    #[must_use]
    pub fn include(mut self, member: MemberHandle) -> Self {
        self.seeds.push(member);
        self
    }

    /// Add several seed members.
    #[must_use]
    pub fn include_all<I>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = MemberHandle>,
    {
        self.seeds.extend(members);
        self
    }

    /// Clone the seeds and everything nested in them into the target.
    ///
    /// The target is left untouched if an error is returned.
    ///
    /// # Errors
    /// - [`crate::Error::EmptySeedSet`] if no seed was included
    /// - [`crate::Error::InvalidSeedModule`] if a seed belongs to another module than the source
    /// - [`crate::Error::UnresolvedReference`] if a cloned member refers to a missing row
    /// - [`crate::Error::Malformed`] if a seed is not a type, method, field, property or event
    pub fn clone_members(self) -> Result<CloneResult> {
        let MetadataCloner {
            source,
            target,
            seeds,
            options,
        } = self;

        if seeds.is_empty() {
            return Err(EmptySeedSet);
        }
        if let Some(foreign) = seeds.iter().find(|seed| seed.module != source.id()) {
            return Err(InvalidSeedModule(foreign.token));
        }

        let tokens: Vec<Token> = seeds.iter().map(|seed| seed.token).collect();
        let closure = CloneClosure::discover(source, &tokens)?;
        closure.validate(source, options.copy_custom_attributes)?;

        let checkpoint = target.checkpoint();
        let mut context = CloneContext::new(source, target, closure, options);
        match context.run() {
            Ok(result) => {
                debug!(
                    "Cloned {} members of {} into {}",
                    result.cloned_members.len(),
                    context.source.name,
                    context.target.name
                );
                Ok(result)
            }
            Err(error) => {
                if let Err(rollback) = context.target.rollback(&checkpoint) {
                    warn!("Failed to roll back {}: {}", context.target.name, rollback);
                }
                Err(error)
            }
        }
    }
}

impl CloneContext<'_> {
    fn run(&mut self) -> Result<CloneResult> {
        self.create_shells()?;
        self.populate()?;
        if self.options.copy_custom_attributes {
            self.copy_custom_attributes()?;
        }

        let cloned_members = self.cloned_all(&self.closure.members)?;
        let root_members = self.cloned_all(&self.closure.roots)?;

        let mut top_level_types = Vec::new();
        for member in &cloned_members {
            if member.is_table(TableId::TypeDef)
                && self.target.type_def(*member)?.declaring_type.is_none()
            {
                top_level_types.push(*member);
            }
        }

        Ok(CloneResult {
            cloned_members,
            root_members,
            map: self.map.clone(),
            top_level_types,
        })
    }

    /// Append one empty row per cloned member, carrying only its name and flags.
    fn create_shells(&mut self) -> Result<()> {
        let source = self.source;
        for token in &self.closure.members {
            let shell = match token.table_id() {
                Some(TableId::TypeDef) => {
                    let row = source.type_def(*token)?;
                    self.target.add_type_def(TypeDef {
                        flags: row.flags,
                        namespace: row.namespace.clone(),
                        name: row.name.clone(),
                        ..TypeDef::default()
                    })
                }
                Some(TableId::MethodDef) => {
                    let row = source.method_def(*token)?;
                    self.target.add_method_def(MethodDef {
                        flags: row.flags,
                        impl_flags: row.impl_flags,
                        name: row.name.clone(),
                        ..MethodDef::default()
                    })
                }
                Some(TableId::Field) => {
                    let row = source.field_def(*token)?;
                    self.target.add_field_def(FieldDef {
                        flags: row.flags,
                        name: row.name.clone(),
                        ..FieldDef::default()
                    })
                }
                Some(TableId::Property) => {
                    let row = source.property_def(*token)?;
                    self.target.add_property_def(PropertyDef {
                        flags: row.flags,
                        name: row.name.clone(),
                        ..PropertyDef::default()
                    })
                }
                Some(TableId::Event) => {
                    let row = source.event_def(*token)?;
                    self.target.add_event_def(EventDef {
                        flags: row.flags,
                        name: row.name.clone(),
                        ..EventDef::default()
                    })
                }
                _ => return Err(malformed_error!("Cannot clone {}", token)),
            };

            trace!("Shell {} for {}", shell, token);
            self.map.insert(*token, shell);
        }

        for token in &self.closure.params {
            let row = source.param_def(*token)?;
            let shell = self.target.add_param_def(ParamDef {
                flags: row.flags,
                sequence: row.sequence,
                name: row.name.clone(),
                ..ParamDef::default()
            });

            trace!("Shell {} for {}", shell, token);
            self.map.insert(*token, shell);
        }
        Ok(())
    }

    /// Fill every shell with the translated content of its original.
    fn populate(&mut self) -> Result<()> {
        let source = self.source;
        let members = self.closure.members.clone();
        for token in members {
            let clone = self.cloned(token)?;
            trace!("Populating {} from {}", clone, token);

            match token.table_id() {
                Some(TableId::TypeDef) => {
                    let row = source.type_def(token)?;
                    let populated = TypeDef {
                        flags: row.flags,
                        namespace: row.namespace.clone(),
                        name: row.name.clone(),
                        extends: self.map_optional(row.extends)?,
                        interfaces: self.map_or_import_all(&row.interfaces)?,
                        fields: self.cloned_all(&row.fields)?,
                        methods: self.cloned_all(&row.methods)?,
                        properties: self.cloned_all(&row.properties)?,
                        events: self.cloned_all(&row.events)?,
                        nested_types: self.cloned_all(&row.nested_types)?,
                        declaring_type: self.cloned_declaring(row.declaring_type),
                        generic_params: self.clone_generic_params(&row.generic_params)?,
                    };
                    *self.target.type_def_mut(clone)? = populated;
                }
                Some(TableId::MethodDef) => {
                    let row = source.method_def(token)?;
                    let body = match &row.body {
                        Some(body) => Some(self.clone_body(body)?),
                        None => None,
                    };
                    let populated = MethodDef {
                        flags: row.flags,
                        impl_flags: row.impl_flags,
                        name: row.name.clone(),
                        signature: self.translate_method(&row.signature)?,
                        params: self.cloned_all(&row.params)?,
                        body,
                        declaring_type: self.cloned_declaring(row.declaring_type),
                        generic_params: self.clone_generic_params(&row.generic_params)?,
                    };

                    for param in &row.params {
                        let original = source.param_def(*param)?;
                        let param_clone = self.cloned(*param)?;
                        *self.target.param_def_mut(param_clone)? = ParamDef {
                            flags: original.flags,
                            sequence: original.sequence,
                            name: original.name.clone(),
                            method: clone,
                            constant: original.constant.clone(),
                        };
                    }
                    *self.target.method_def_mut(clone)? = populated;
                }
                Some(TableId::Field) => {
                    let row = source.field_def(token)?;
                    let populated = FieldDef {
                        flags: row.flags,
                        name: row.name.clone(),
                        signature: self.translate_field(&row.signature)?,
                        declaring_type: self.cloned_declaring(row.declaring_type),
                        constant: row.constant.clone(),
                    };
                    *self.target.field_def_mut(clone)? = populated;
                }
                Some(TableId::Property) => {
                    let row = source.property_def(token)?;
                    let populated = PropertyDef {
                        flags: row.flags,
                        name: row.name.clone(),
                        signature: self.translate_property(&row.signature)?,
                        getter: row.getter.map(|getter| self.cloned(getter)).transpose()?,
                        setter: row.setter.map(|setter| self.cloned(setter)).transpose()?,
                        others: self.cloned_all(&row.others)?,
                        declaring_type: self.cloned_declaring(row.declaring_type),
                    };
                    *self.target.property_def_mut(clone)? = populated;
                }
                Some(TableId::Event) => {
                    let row = source.event_def(token)?;
                    let populated = EventDef {
                        flags: row.flags,
                        name: row.name.clone(),
                        event_type: self.map_optional(row.event_type)?,
                        add: row.add.map(|add| self.cloned(add)).transpose()?,
                        remove: row.remove.map(|remove| self.cloned(remove)).transpose()?,
                        raise: row.raise.map(|raise| self.cloned(raise)).transpose()?,
                        others: self.cloned_all(&row.others)?,
                        declaring_type: self.cloned_declaring(row.declaring_type),
                    };
                    *self.target.event_def_mut(clone)? = populated;
                }
                _ => return Err(malformed_error!("Cannot clone {}", token)),
            }
        }
        Ok(())
    }

    /// Declaring type of a clone; members cloned without their type are detached.
    fn cloned_declaring(&self, declaring: Option<Token>) -> Option<Token> {
        declaring.and_then(|declaring| self.map.get(&declaring).copied())
    }

    fn clone_generic_params(&mut self, params: &[GenericParam]) -> Result<Vec<GenericParam>> {
        params
            .iter()
            .map(|param| {
                Ok(GenericParam {
                    number: param.number,
                    flags: param.flags,
                    name: param.name.clone(),
                    constraints: self.map_or_import_all(&param.constraints)?,
                })
            })
            .collect()
    }

    /// Copy the custom attributes of every cloned member and parameter.
    ///
    /// The value blob is copied as is; it names types by string only.
    fn copy_custom_attributes(&mut self) -> Result<()> {
        let source = self.source;
        let parents: Vec<Token> = self
            .closure
            .members
            .iter()
            .chain(&self.closure.params)
            .copied()
            .collect();

        let mut copied = 0usize;
        for parent in parents {
            let clone = self.cloned(parent)?;
            for (_, attribute) in source.custom_attributes_of(parent) {
                let constructor = self.map_or_import(attribute.constructor)?;
                self.target.add_custom_attribute(CustomAttribute {
                    parent: clone,
                    constructor,
                    value: attribute.value.clone(),
                });
                copied += 1;
            }
        }

        debug!("Copied {} custom attributes", copied);
        Ok(())
    }
}
