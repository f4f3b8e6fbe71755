//! SymbolTable - declarations visible to the binder.
//!
//! [`SymbolTable`] is the central store for every type, procedure, property and
//! field the binder can see. Declarations are keyed by [`TypeHash`]; name-based
//! indexes are kept alongside for lookups from source.
//!
//! # Storage Model
//!
//! - **Types**: all [`TypeEntry`] values in one map by hash, plus a case-folded
//!   qualified-name index (one name may carry several arities) and a
//!   per-namespace index.
//! - **Members**: procedures, properties and fields each live in their own map.
//!   Owning types reference them through [`MemberRef`] in declaration order.
//! - **Extension methods**: indexed by case-folded name, since they are found
//!   by name regardless of the receiver's declaring type.
//!
//! # Mutation
//!
//! The table is populated by the host before binding starts and is read-only
//! while the binder runs; the binder only ever holds `&SymbolTable`.
//!
//! # Example
//!
//! ```
//! use basalt_symbols::{SymbolTable, TypeEntry};
//!
//! let mut table = SymbolTable::new();
//! let hash = table.register_type(TypeEntry::class("Widget").in_namespace("Ui")).unwrap();
//! assert_eq!(table.resolve_type_name("ui.widget", &[], 0), Some(hash));
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use basalt_core::{DataType, PrimitiveKind, TypeHash};

use crate::entries::{
    Access, FieldEntry, MemberRef, ParamEntry, ProcedureEntry, ProcedureKind, PropertyEntry, TypeEntry, fold_name,
};
use crate::error::RegistrationError;
use crate::runtime::WellKnownType;

/// The parameter list and return type of a delegate, instantiated for one
/// concrete delegate type.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateSignature {
    pub invoke: TypeHash,
    pub params: Vec<ParamEntry>,
    pub return_type: DataType,
}

/// Declarations visible to the binder.
#[derive(Debug, Default)]
pub struct SymbolTable {
    // === Types ===
    types: FxHashMap<TypeHash, TypeEntry>,
    /// Folded qualified name -> every arity declared under that name.
    types_by_name: FxHashMap<String, Vec<TypeHash>>,
    /// Folded namespace -> types declared directly in it.
    types_by_namespace: FxHashMap<String, Vec<TypeHash>>,
    /// Runtime types that stand for a primitive (`System.Int32`, ...).
    primitive_types: FxHashMap<TypeHash, PrimitiveKind>,

    // === Members ===
    procedures: FxHashMap<TypeHash, ProcedureEntry>,
    properties: FxHashMap<TypeHash, PropertyEntry>,
    fields: FxHashMap<TypeHash, FieldEntry>,
    extension_methods: FxHashMap<String, Vec<TypeHash>>,
    /// Generic owner -> parameter names, for display.
    generic_names: FxHashMap<TypeHash, Vec<String>>,

    // === Namespaces ===
    /// Folded namespace -> name as declared.
    namespaces: FxHashMap<String, String>,
    imports: Vec<String>,
    xml_prefixes: FxHashSet<String>,

    well_known: FxHashMap<WellKnownType, TypeHash>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a type. Fails if a type with the same qualified name and arity
    /// already exists.
    pub fn register_type(&mut self, entry: TypeEntry) -> Result<TypeHash, RegistrationError> {
        let hash = entry.hash;
        if self.types.contains_key(&hash) {
            return Err(RegistrationError::DuplicateType(entry.qualified_name.clone()));
        }

        let folded = fold_name(&entry.qualified_name);
        if entry.arity() == 0
            && let Some(kind) = PrimitiveKind::ALL
                .into_iter()
                .find(|k| k.runtime_name().eq_ignore_ascii_case(&entry.qualified_name))
        {
            self.primitive_types.insert(hash, kind);
        }
        self.types_by_name.entry(folded).or_default().push(hash);
        self.types_by_namespace
            .entry(fold_name(&entry.namespace))
            .or_default()
            .push(hash);
        if !entry.namespace.is_empty() {
            self.register_namespace(&entry.namespace);
        }
        if entry.arity() > 0 {
            self.generic_names
                .insert(hash, entry.generic_params.iter().map(|p| p.name.clone()).collect());
        }

        self.types.insert(hash, entry);
        Ok(hash)
    }

    /// Register a procedure and attach it to its owner.
    pub fn register_procedure(&mut self, entry: ProcedureEntry) -> Result<TypeHash, RegistrationError> {
        let hash = entry.hash;
        if self.procedures.contains_key(&hash) {
            return Err(RegistrationError::DuplicateRegistration {
                name: entry.name.clone(),
                kind: "procedure",
            });
        }
        let owner = self
            .types
            .get_mut(&entry.owner)
            .ok_or_else(|| RegistrationError::OwnerNotFound(entry.name.clone()))?;
        owner.members.push(MemberRef::Procedure(hash));
        if owner.is_delegate() && entry.name.eq_ignore_ascii_case("Invoke") {
            owner.invoke = Some(hash);
        }

        if entry.is_extension {
            self.extension_methods
                .entry(fold_name(&entry.name))
                .or_default()
                .push(hash);
        }
        if entry.is_generic() {
            self.generic_names.insert(
                entry.generic_owner,
                entry.generic_params.iter().map(|p| p.name.clone()).collect(),
            );
        }

        self.procedures.insert(hash, entry);
        Ok(hash)
    }

    pub fn register_property(&mut self, entry: PropertyEntry) -> Result<TypeHash, RegistrationError> {
        let hash = entry.hash;
        if self.properties.contains_key(&hash) {
            return Err(RegistrationError::DuplicateRegistration {
                name: entry.name.clone(),
                kind: "property",
            });
        }
        let owner = self
            .types
            .get_mut(&entry.owner)
            .ok_or_else(|| RegistrationError::OwnerNotFound(entry.name.clone()))?;
        owner.members.push(MemberRef::Property(hash));
        self.properties.insert(hash, entry);
        Ok(hash)
    }

    pub fn register_field(&mut self, entry: FieldEntry) -> Result<TypeHash, RegistrationError> {
        let hash = entry.hash;
        if self.fields.contains_key(&hash) {
            return Err(RegistrationError::DuplicateRegistration {
                name: entry.name.clone(),
                kind: "field",
            });
        }
        let owner = self
            .types
            .get_mut(&entry.owner)
            .ok_or_else(|| RegistrationError::OwnerNotFound(entry.name.clone()))?;
        owner.members.push(MemberRef::Field(hash));
        self.fields.insert(hash, entry);
        Ok(hash)
    }

    /// Register a namespace and every enclosing namespace.
    pub fn register_namespace(&mut self, namespace: &str) {
        let mut prefix = String::new();
        for part in namespace.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            self.namespaces
                .entry(fold_name(&prefix))
                .or_insert_with(|| prefix.clone());
        }
    }

    /// Add a project-level `Imports` of a namespace.
    pub fn add_import(&mut self, namespace: &str) {
        if !self.imports.iter().any(|i| i.eq_ignore_ascii_case(namespace)) {
            self.imports.push(namespace.to_string());
        }
    }

    /// Declare an XML namespace prefix (`Imports <xmlns:p="...">`).
    pub fn add_xml_prefix(&mut self, prefix: &str) {
        self.xml_prefixes.insert(fold_name(prefix));
    }

    // ==========================================================================
    // Direct Lookup
    // ==========================================================================

    pub fn get_type(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    pub fn get_procedure(&self, hash: TypeHash) -> Option<&ProcedureEntry> {
        self.procedures.get(&hash)
    }

    pub fn get_property(&self, hash: TypeHash) -> Option<&PropertyEntry> {
        self.properties.get(&hash)
    }

    pub fn get_field(&self, hash: TypeHash) -> Option<&FieldEntry> {
        self.fields.get(&hash)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn procedure_count(&self) -> usize {
        self.procedures.len()
    }

    /// Name of the declaration a member reference points at.
    pub fn member_name(&self, member: MemberRef) -> Option<&str> {
        match member {
            MemberRef::Procedure(h) => self.procedures.get(&h).map(|p| p.name.as_str()),
            MemberRef::Property(h) => self.properties.get(&h).map(|p| p.name.as_str()),
            MemberRef::Field(h) => self.fields.get(&h).map(|f| f.name.as_str()),
            MemberRef::Type(h) => self.types.get(&h).map(|t| t.name.as_str()),
        }
    }

    /// Access level and declaring type of a member.
    pub fn member_access(&self, member: MemberRef) -> Option<(Access, TypeHash)> {
        match member {
            MemberRef::Procedure(h) => self.procedures.get(&h).map(|p| (p.access, p.owner)),
            MemberRef::Property(h) => self.properties.get(&h).map(|p| (p.access, p.owner)),
            MemberRef::Field(h) => self.fields.get(&h).map(|f| (f.access, f.owner)),
            MemberRef::Type(h) => self.types.get(&h).map(|t| (t.access, t.hash)),
        }
    }

    // ==========================================================================
    // Name Lookup
    // ==========================================================================

    /// Every type declared under a fully qualified name, any arity.
    pub fn types_named(&self, qualified: &str) -> impl Iterator<Item = &TypeEntry> {
        self.types_by_name
            .get(&fold_name(qualified))
            .into_iter()
            .flatten()
            .filter_map(|h| self.types.get(h))
    }

    /// The type with this fully qualified name and arity.
    pub fn type_by_name(&self, qualified: &str, arity: usize) -> Option<&TypeEntry> {
        self.types_named(qualified).find(|t| t.arity() == arity)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        namespace.is_empty() || self.namespaces.contains_key(&fold_name(namespace))
    }

    /// The declared spelling of a namespace.
    pub fn namespace_name(&self, namespace: &str) -> Option<&str> {
        self.namespaces.get(&fold_name(namespace)).map(String::as_str)
    }

    /// `parent.name` if that namespace exists.
    pub fn child_namespace(&self, parent: &str, name: &str) -> Option<String> {
        let candidate = qualify(parent, name);
        self.namespace_name(&candidate).map(str::to_string)
    }

    pub fn types_in_namespace<'a>(&'a self, namespace: &str) -> impl Iterator<Item = &'a TypeEntry> {
        self.types_by_namespace
            .get(&fold_name(namespace))
            .into_iter()
            .flatten()
            .filter_map(|h| self.types.get(h))
    }

    /// Members named `name` of the standard modules declared in `namespace`.
    ///
    /// Module members are promoted into the enclosing namespace, so they are
    /// found by name without qualification.
    pub fn module_members(&self, namespace: &str, name: &str) -> Vec<MemberRef> {
        self.types_in_namespace(namespace)
            .filter(|t| t.is_module())
            .flat_map(|t| self.declared_members(t.hash, name))
            .collect()
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn is_xml_prefix(&self, name: &str) -> bool {
        self.xml_prefixes.contains(&fold_name(name))
    }

    /// Resolve a possibly qualified type name with the given arity.
    ///
    /// Tries, in order: the name as written (if dotted), the current namespace
    /// from innermost to outermost, then each import.
    pub fn resolve_type_name(&self, name: &str, current_namespace: &[String], arity: usize) -> Option<TypeHash> {
        if let Some(entry) = self.type_by_name(name, arity) {
            return Some(entry.hash);
        }

        for i in (1..=current_namespace.len()).rev() {
            let ns = current_namespace[..i].join(".");
            if let Some(entry) = self.type_by_name(&qualify(&ns, name), arity) {
                return Some(entry.hash);
            }
        }

        self.imports
            .iter()
            .find_map(|import| self.type_by_name(&qualify(import, name), arity))
            .map(|entry| entry.hash)
    }

    /// Members of one type (not its bases) with the given name.
    pub fn declared_members(&self, owner: TypeHash, name: &str) -> Vec<MemberRef> {
        let Some(entry) = self.types.get(&owner) else {
            return Vec::new();
        };
        entry
            .members
            .iter()
            .copied()
            .filter(|m| self.member_name(*m).is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .collect()
    }

    /// Members named `name` visible on `ty`, walking base types and (for
    /// interfaces) inherited interfaces.
    ///
    /// A procedure in a derived type shadows a base procedure with the same
    /// parameter types; a non-procedure member hides everything of that name
    /// further up the hierarchy.
    pub fn lookup_member(&self, ty: &DataType, name: &str) -> Vec<MemberRef> {
        let mut found: Vec<MemberRef> = Vec::new();
        for level in self.member_hierarchy(ty) {
            let Some(hash) = self.declaring_hash(&level) else {
                continue;
            };
            for member in self.declared_members(hash, name) {
                match member {
                    MemberRef::Procedure(candidate) => {
                        let shadowed = found.iter().any(|existing| match existing {
                            MemberRef::Procedure(e) => self.same_signature(*e, candidate),
                            _ => false,
                        });
                        if !shadowed {
                            found.push(member);
                        }
                    }
                    _ if found.is_empty() => found.push(member),
                    _ => {}
                }
            }
            if found.iter().any(|m| !matches!(m, MemberRef::Procedure(_))) {
                break;
            }
        }
        found
    }

    fn same_signature(&self, a: TypeHash, b: TypeHash) -> bool {
        let (Some(a), Some(b)) = (self.procedures.get(&a), self.procedures.get(&b)) else {
            return false;
        };
        a.arity() == b.arity()
            && a.call_params().len() == b.call_params().len()
            && a
                .call_params()
                .iter()
                .zip(b.call_params())
                .all(|(x, y)| x.by_ref == y.by_ref && self.normalize(x.ty.clone()) == self.normalize(y.ty.clone()))
    }

    /// The type itself, its bases, and for interfaces every inherited interface.
    fn member_hierarchy(&self, ty: &DataType) -> Vec<DataType> {
        let mut chain = Vec::new();
        let mut current = Some(ty.clone());
        while let Some(level) = current {
            current = self.base_type(&level);
            chain.push(level);
        }
        if self.is_interface(ty) {
            chain.extend(self.interfaces_of(ty));
            chain.push(DataType::Object);
        }
        chain
    }

    /// Extension methods with this name, in registration order.
    pub fn extension_methods(&self, name: &str) -> Vec<&ProcedureEntry> {
        self.extension_methods
            .get(&fold_name(name))
            .into_iter()
            .flatten()
            .filter_map(|h| self.procedures.get(h))
            .collect()
    }

    // ==========================================================================
    // Type Relationships
    // ==========================================================================

    /// Map runtime spellings of built-in types onto their canonical form
    /// (`System.Object` to `Object`, `System.Int32` to `Integer`, ...).
    pub fn normalize(&self, ty: DataType) -> DataType {
        match ty {
            DataType::Named { hash, args } => {
                if self.well_known.get(&WellKnownType::Object) == Some(&hash) {
                    DataType::Object
                } else if let Some(kind) = self.primitive_types.get(&hash) {
                    DataType::Primitive(*kind)
                } else {
                    DataType::Named {
                        hash,
                        args: args.into_iter().map(|a| self.normalize(a)).collect(),
                    }
                }
            }
            DataType::Array { element, rank } => DataType::array(self.normalize(*element), rank),
            DataType::Nullable(inner) => DataType::nullable(self.normalize(*inner)),
            other => other,
        }
    }

    /// The registry entry whose members a value of `ty` exposes.
    pub fn declaring_hash(&self, ty: &DataType) -> Option<TypeHash> {
        match ty {
            DataType::Named { hash, .. } => Some(*hash),
            DataType::Primitive(kind) => self.type_by_name(kind.runtime_name(), 0).map(|t| t.hash),
            DataType::Object => self.well_known(WellKnownType::Object),
            DataType::Array { .. } => self.well_known(WellKnownType::Array),
            _ => None,
        }
    }

    pub fn entry_of(&self, ty: &DataType) -> Option<&TypeEntry> {
        self.declaring_hash(ty).and_then(|h| self.types.get(&h))
    }

    /// Direct base type, instantiated for `ty`'s type arguments.
    pub fn base_type(&self, ty: &DataType) -> Option<DataType> {
        match ty {
            DataType::Void | DataType::Error | DataType::Object => None,
            DataType::GenericParam { .. } | DataType::Nullable(_) | DataType::Primitive(_) => Some(DataType::Object),
            DataType::Array { .. } => Some(
                self.well_known(WellKnownType::Array)
                    .map(DataType::named)
                    .unwrap_or(DataType::Object),
            ),
            DataType::Named { hash, args } => {
                let entry = self.types.get(hash)?;
                if entry.is_interface() || self.well_known(WellKnownType::Object) == Some(*hash) {
                    return None;
                }
                match &entry.base {
                    Some(base) => Some(self.normalize(base.substitute(entry.hash, args))),
                    None => Some(DataType::Object),
                }
            }
        }
    }

    /// Every interface `ty` implements, directly or through bases and
    /// interface inheritance, instantiated for `ty`.
    pub fn interfaces_of(&self, ty: &DataType) -> Vec<DataType> {
        let mut pending = Vec::new();
        let mut current = Some(ty.clone());
        while let Some(level) = current {
            pending.extend(self.direct_interfaces(&level));
            current = self.base_type(&level);
        }

        let mut out: Vec<DataType> = Vec::new();
        while let Some(iface) = pending.pop() {
            if out.contains(&iface) {
                continue;
            }
            pending.extend(self.direct_interfaces(&iface));
            out.push(iface);
        }
        out
    }

    fn direct_interfaces(&self, ty: &DataType) -> Vec<DataType> {
        if let DataType::Array { element, rank: 1 } = ty {
            return self
                .well_known(WellKnownType::GenericEnumerable)
                .map(|h| vec![DataType::generic(h, vec![(**element).clone()])])
                .unwrap_or_default();
        }
        let DataType::Named { hash, args } = ty else {
            return Vec::new();
        };
        self.types
            .get(hash)
            .map(|entry| {
                entry
                    .interfaces
                    .iter()
                    .map(|i| self.normalize(i.substitute(entry.hash, args)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True if `base` is a proper base class of `derived`.
    pub fn is_derived_from(&self, derived: &DataType, base: &DataType) -> bool {
        let mut current = self.base_type(derived);
        while let Some(level) = current {
            if &level == base {
                return true;
            }
            current = self.base_type(&level);
        }
        false
    }

    pub fn implements_interface(&self, ty: &DataType, iface: &DataType) -> bool {
        self.interfaces_of(ty).contains(iface)
    }

    /// Type arguments with which `owner` appears in `ty`'s hierarchy.
    pub fn instantiation_of(&self, ty: &DataType, owner: TypeHash) -> Option<Vec<DataType>> {
        let mut current = Some(ty.clone());
        while let Some(level) = current {
            if self.declaring_hash(&level) == Some(owner) {
                return Some(level.type_args().to_vec());
            }
            current = self.base_type(&level);
        }
        self.interfaces_of(ty)
            .into_iter()
            .find(|i| i.type_hash() == Some(owner))
            .map(|i| i.type_args().to_vec())
    }

    /// A member's declared type as seen through `receiver`.
    pub fn member_type(&self, receiver: &DataType, owner: TypeHash, declared: &DataType) -> DataType {
        match self.instantiation_of(receiver, owner) {
            Some(args) if !args.is_empty() => self.normalize(declared.substitute(owner, &args)),
            _ => self.normalize(declared.clone()),
        }
    }

    pub fn is_reference_type(&self, ty: &DataType) -> bool {
        match ty {
            DataType::Object | DataType::Array { .. } => true,
            DataType::Primitive(kind) => !kind.is_value_type(),
            DataType::Named { hash, .. } => self.types.get(hash).is_some_and(|t| t.kind.is_reference()),
            _ => false,
        }
    }

    pub fn is_value_type(&self, ty: &DataType) -> bool {
        match ty {
            DataType::Primitive(kind) => kind.is_value_type(),
            DataType::Nullable(_) => true,
            DataType::Named { hash, .. } => self.types.get(hash).is_some_and(TypeEntry::is_value_type),
            _ => false,
        }
    }

    pub fn is_interface(&self, ty: &DataType) -> bool {
        matches!(ty, DataType::Named { hash, .. } if self.types.get(hash).is_some_and(TypeEntry::is_interface))
    }

    pub fn is_delegate(&self, ty: &DataType) -> bool {
        matches!(ty, DataType::Named { hash, .. } if self.types.get(hash).is_some_and(TypeEntry::is_delegate))
    }

    pub fn enum_underlying(&self, ty: &DataType) -> Option<PrimitiveKind> {
        match ty {
            DataType::Named { hash, .. } => self.types.get(hash).and_then(TypeEntry::enum_underlying),
            _ => None,
        }
    }

    /// `Invoke` signature of a delegate type.
    pub fn delegate_signature(&self, ty: &DataType) -> Option<DelegateSignature> {
        let DataType::Named { hash, args } = ty else {
            return None;
        };
        let entry = self.types.get(hash)?;
        let invoke = self.procedures.get(&entry.invoke?)?;
        let params = invoke
            .params
            .iter()
            .map(|p| ParamEntry {
                ty: self.normalize(p.ty.substitute(entry.hash, args)),
                ..p.clone()
            })
            .collect();
        Some(DelegateSignature {
            invoke: invoke.hash,
            params,
            return_type: self.normalize(invoke.return_type.substitute(entry.hash, args)),
        })
    }

    /// Name of the default member of `ty` or its nearest base that has one.
    pub fn default_member(&self, ty: &DataType) -> Option<&str> {
        let mut current = Some(ty.clone());
        while let Some(level) = current {
            if let Some(name) = self.entry_of(&level).and_then(|e| e.default_member.as_deref()) {
                return Some(name);
            }
            current = self.base_type(&level);
        }
        None
    }

    /// Procedures declared on `ty` or its bases that satisfy `predicate`.
    pub fn operators_of(&self, ty: &DataType, predicate: impl Fn(&ProcedureEntry) -> bool) -> Vec<&ProcedureEntry> {
        let mut out = Vec::new();
        let mut current = Some(ty.strip_nullable().clone());
        while let Some(level) = current {
            if let Some(entry) = self.entry_of(&level) {
                out.extend(
                    entry
                        .members
                        .iter()
                        .filter_map(|m| match m {
                            MemberRef::Procedure(h) => self.procedures.get(h),
                            _ => None,
                        })
                        .filter(|p| predicate(p)),
                );
            }
            current = self.base_type(&level);
        }
        out
    }

    /// User-defined conversion operators declared on `ty` or its bases.
    pub fn conversion_operators(&self, ty: &DataType) -> Vec<&ProcedureEntry> {
        self.operators_of(ty, |p| matches!(p.kind, ProcedureKind::Conversion { .. }))
    }

    /// User-defined operators with the given runtime name (`op_Addition`, ...).
    pub fn user_operators(&self, ty: &DataType, name: &str) -> Vec<&ProcedureEntry> {
        self.operators_of(ty, |p| p.kind == ProcedureKind::Operator && p.name.eq_ignore_ascii_case(name))
    }

    // ==========================================================================
    // Accessibility
    // ==========================================================================

    /// Whether a member with `access` declared on `owner` is visible from code
    /// inside `from` (`None` for code outside any type).
    pub fn is_accessible(&self, access: Access, owner: TypeHash, from: Option<TypeHash>) -> bool {
        match access {
            Access::Public | Access::Friend => true,
            Access::Private => from == Some(owner),
            Access::Protected => from.is_some_and(|f| f == owner || self.derives_from_hash(f, owner)),
        }
    }

    pub fn is_member_accessible(&self, member: MemberRef, from: Option<TypeHash>) -> bool {
        self.member_access(member)
            .is_some_and(|(access, owner)| self.is_accessible(access, owner, from))
    }

    fn derives_from_hash(&self, derived: TypeHash, base: TypeHash) -> bool {
        let Some(entry) = self.types.get(&derived) else {
            return false;
        };
        let mut current = self.base_type(&entry.self_type());
        while let Some(level) = current {
            if self.declaring_hash(&level) == Some(base) {
                return true;
            }
            current = self.base_type(&level);
        }
        false
    }

    // ==========================================================================
    // Display
    // ==========================================================================

    /// Source-style rendering of a type for diagnostics.
    pub fn display_type(&self, ty: &DataType) -> String {
        match ty {
            DataType::Void => "Void".to_string(),
            DataType::Error => "?".to_string(),
            DataType::Object => "Object".to_string(),
            DataType::Primitive(kind) => kind.name().to_string(),
            DataType::Named { hash, args } => {
                let name = self
                    .types
                    .get(hash)
                    .map(|t| t.qualified_name.clone())
                    .unwrap_or_else(|| format!("{hash:?}"));
                if args.is_empty() {
                    name
                } else {
                    let args: Vec<String> = args.iter().map(|a| self.display_type(a)).collect();
                    format!("{name}(Of {})", args.join(", "))
                }
            }
            DataType::Array { element, rank } => {
                format!("{}({})", self.display_type(element), ",".repeat(rank.saturating_sub(1) as usize))
            }
            DataType::Nullable(inner) => format!("{}?", self.display_type(inner)),
            DataType::GenericParam { owner, index } => self
                .generic_names
                .get(owner)
                .and_then(|names| names.get(*index as usize))
                .cloned()
                .unwrap_or_else(|| format!("T{index}")),
        }
    }

    /// Rendering of a procedure with its parameter list.
    pub fn display_procedure(&self, procedure: &ProcedureEntry) -> String {
        procedure.display_with(|t| self.display_type(t))
    }

    // ==========================================================================
    // Well-Known Types
    // ==========================================================================

    pub fn set_well_known(&mut self, kind: WellKnownType, hash: TypeHash) {
        self.well_known.insert(kind, hash);
    }

    pub fn well_known(&self, kind: WellKnownType) -> Option<TypeHash> {
        self.well_known.get(&kind).copied()
    }
}

/// Join a namespace and a name with a dot.
pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::GenericParamEntry;

    fn shapes() -> (SymbolTable, TypeHash, TypeHash) {
        let mut table = SymbolTable::new();
        let shape = table.register_type(TypeEntry::abstract_class("Shape").in_namespace("Geo")).unwrap();
        let circle = table
            .register_type(
                TypeEntry::class("Circle")
                    .in_namespace("Geo")
                    .with_base(DataType::named(shape)),
            )
            .unwrap();
        (table, shape, circle)
    }

    #[test]
    fn duplicate_type_rejected() {
        let mut table = SymbolTable::new();
        table.register_type(TypeEntry::class("A")).unwrap();
        assert!(matches!(
            table.register_type(TypeEntry::class("a")),
            Err(RegistrationError::DuplicateType(_))
        ));
    }

    #[test]
    fn member_without_owner_rejected() {
        let mut table = SymbolTable::new();
        let err = table
            .register_field(FieldEntry::new(TypeHash::from_name("Missing"), "x", DataType::integer()))
            .unwrap_err();
        assert_eq!(err, RegistrationError::OwnerNotFound("x".into()));
    }

    #[test]
    fn namespaces_register_prefixes() {
        let mut table = SymbolTable::new();
        table.register_type(TypeEntry::class("C").in_namespace("A.B")).unwrap();
        assert!(table.has_namespace("a"));
        assert!(table.has_namespace("A.B"));
        assert_eq!(table.child_namespace("A", "b").as_deref(), Some("A.B"));
    }

    #[test]
    fn resolve_through_namespace_then_imports() {
        let (mut table, shape, _) = shapes();
        assert_eq!(table.resolve_type_name("Shape", &["Geo".into()], 0), Some(shape));
        assert_eq!(table.resolve_type_name("Shape", &[], 0), None);
        table.add_import("Geo");
        assert_eq!(table.resolve_type_name("shape", &[], 0), Some(shape));
    }

    #[test]
    fn arity_selects_generic_overload() {
        let mut table = SymbolTable::new();
        let plain = table.register_type(TypeEntry::class("Box")).unwrap();
        let generic = table
            .register_type(TypeEntry::class("Box").with_generic_param(GenericParamEntry::new("T")))
            .unwrap();
        assert_eq!(table.resolve_type_name("Box", &[], 0), Some(plain));
        assert_eq!(table.resolve_type_name("Box", &[], 1), Some(generic));
        assert_eq!(table.resolve_type_name("Box", &[], 2), None);
    }

    #[test]
    fn derived_overload_shadows_same_signature() {
        let (mut table, shape, circle) = shapes();
        let int = || vec![ParamEntry::new("x", DataType::integer())];
        table.register_procedure(ProcedureEntry::sub(shape, "Draw", int())).unwrap();
        table
            .register_procedure(ProcedureEntry::sub(shape, "Draw", vec![ParamEntry::new("s", DataType::string())]))
            .unwrap();
        let derived = table.register_procedure(ProcedureEntry::sub(circle, "Draw", int())).unwrap();

        let found = table.lookup_member(&DataType::named(circle), "draw");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], MemberRef::Procedure(derived));
    }

    #[test]
    fn field_hides_base_members() {
        let (mut table, shape, circle) = shapes();
        table.register_procedure(ProcedureEntry::sub(shape, "Size", vec![])).unwrap();
        let field = table.register_field(FieldEntry::new(circle, "Size", DataType::integer())).unwrap();
        assert_eq!(
            table.lookup_member(&DataType::named(circle), "Size"),
            vec![MemberRef::Field(field)]
        );
    }

    #[test]
    fn generic_base_is_substituted() {
        let mut table = SymbolTable::new();
        let list = TypeEntry::class("List").with_generic_param(GenericParamEntry::new("T"));
        let t = list.generic_param(0);
        let list = table.register_type(list).unwrap();
        let item = table
            .register_property(PropertyEntry::read_write(list, "First", t))
            .unwrap();
        let names = table
            .register_type(TypeEntry::class("Names").with_base(DataType::generic(list, vec![DataType::string()])))
            .unwrap();

        let receiver = DataType::named(names);
        let property = table.get_property(item).unwrap();
        assert_eq!(table.member_type(&receiver, list, &property.ty), DataType::string());
        assert_eq!(table.display_type(&DataType::generic(list, vec![DataType::integer()])), "List(Of Integer)");
    }

    #[test]
    fn protected_access_requires_derivation() {
        let (table, shape, circle) = shapes();
        assert!(table.is_accessible(Access::Protected, shape, Some(circle)));
        assert!(!table.is_accessible(Access::Protected, circle, Some(shape)));
        assert!(!table.is_accessible(Access::Private, shape, None));
        assert!(table.is_accessible(Access::Friend, shape, None));
    }

    #[test]
    fn interfaces_are_transitive() {
        let mut table = SymbolTable::new();
        let base = table.register_type(TypeEntry::interface("IBase")).unwrap();
        let derived = table
            .register_type(TypeEntry::interface("IDerived").with_interface(DataType::named(base)))
            .unwrap();
        let class = table
            .register_type(TypeEntry::class("Impl").with_interface(DataType::named(derived)))
            .unwrap();
        assert!(table.implements_interface(&DataType::named(class), &DataType::named(base)));
        assert!(table.is_reference_type(&DataType::named(class)));
    }
}
