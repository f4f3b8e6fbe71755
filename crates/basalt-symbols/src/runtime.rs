//! The runtime library surface the binder relies on.
//!
//! Several expression forms lower to calls on well-known runtime types:
//! string concatenation helpers, `GetType`, `Activator` construction, COM
//! default-value wrappers, the awaiter pattern, XML literals and query
//! operators. [`SymbolTable::with_runtime`] registers a minimal model of
//! those types so hosts and tests get them without writing the declarations
//! by hand.

use basalt_core::{DataType, PrimitiveKind};

use crate::entries::{
    FieldEntry, GenericParamEntry, ParamEntry, ProcedureEntry, PropertyEntry, TypeEntry,
};
use crate::error::RegistrationError;
use crate::table::SymbolTable;

/// Runtime types the binder refers to by role rather than by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownType {
    Object,
    String,
    Array,
    /// `System.Type`, the result of `GetType(T)`.
    Type,
    Attribute,
    Activator,
    /// `System.Reflection.Missing`, default for omitted COM `Object` parameters.
    Missing,
    DispatchWrapper,
    UnknownWrapper,
    /// Completion-notification interface required of non-late-bound awaiters.
    NotifyCompletion,
    XElement,
    /// `IEnumerable(Of T)`.
    GenericEnumerable,
    /// `List(Of T)`.
    GenericList,
}

impl SymbolTable {
    /// A table pre-populated with the runtime library model.
    pub fn with_runtime() -> Result<Self, RegistrationError> {
        let mut table = Self::new();
        table.register_runtime()?;
        Ok(table)
    }

    /// The runtime type registered for `kind`, as a `DataType`.
    pub fn well_known_type(&self, kind: WellKnownType) -> Option<DataType> {
        self.well_known(kind).map(|hash| self.normalize(DataType::named(hash)))
    }

    /// `System.Func(Of ...)` with `args.len() - 1` parameters, if registered.
    pub fn func_type(&self, args: Vec<DataType>) -> Option<DataType> {
        let entry = self.type_by_name("System.Func", args.len())?;
        Some(DataType::generic(entry.hash, args))
    }

    /// `System.Action(Of ...)`, if registered.
    pub fn action_type(&self, args: Vec<DataType>) -> Option<DataType> {
        let entry = self.type_by_name("System.Action", args.len())?;
        Some(DataType::generic(entry.hash, args))
    }

    /// Register the runtime library model into this table.
    pub fn register_runtime(&mut self) -> Result<(), RegistrationError> {
        let string = DataType::string();
        let object = DataType::Object;

        // === System ===
        let object_hash = self.register_type(TypeEntry::class("Object").in_namespace("System"))?;
        self.set_well_known(WellKnownType::Object, object_hash);
        let type_hash = self.register_type(TypeEntry::abstract_class("Type").in_namespace("System"))?;
        self.set_well_known(WellKnownType::Type, type_hash);
        let type_ty = DataType::named(type_hash);

        self.register_procedure(ProcedureEntry::method(object_hash, "ToString", vec![], string.clone()))?;
        self.register_procedure(ProcedureEntry::method(object_hash, "GetType", vec![], type_ty.clone()))?;
        self.register_procedure(ProcedureEntry::method(
            object_hash,
            "Equals",
            vec![ParamEntry::new("obj", object.clone())],
            DataType::boolean(),
        ))?;
        self.register_procedure(
            ProcedureEntry::method(
                type_hash,
                "GetTypeFromCLSID",
                vec![ParamEntry::new("clsid", string.clone())],
                type_ty.clone(),
            )
            .shared(),
        )?;

        let string_hash = self.register_type(
            TypeEntry::class("String")
                .in_namespace("System")
                .with_default_member("Chars"),
        )?;
        self.set_well_known(WellKnownType::String, string_hash);
        self.register_property(PropertyEntry::read_only(string_hash, "Length", DataType::integer()))?;
        self.register_property(
            PropertyEntry::indexed(
                string_hash,
                "Chars",
                vec![ParamEntry::new("index", DataType::integer())],
                DataType::primitive(PrimitiveKind::Char),
            )
            .without_setter(),
        )?;
        for arity in 2..=4 {
            let params = (0..arity)
                .map(|i| ParamEntry::new(&format!("str{i}"), string.clone()))
                .collect();
            self.register_procedure(ProcedureEntry::method(string_hash, "Concat", params, string.clone()).shared())?;
        }
        self.register_procedure(
            ProcedureEntry::method(
                string_hash,
                "Concat",
                vec![ParamEntry::param_array("values", string.clone())],
                string.clone(),
            )
            .shared(),
        )?;

        let array_hash = self.register_type(TypeEntry::abstract_class("Array").in_namespace("System"))?;
        self.set_well_known(WellKnownType::Array, array_hash);
        self.register_property(PropertyEntry::read_only(array_hash, "Length", DataType::integer()))?;
        self.register_procedure(ProcedureEntry::method(
            array_hash,
            "GetLength",
            vec![ParamEntry::new("dimension", DataType::integer())],
            DataType::integer(),
        ))?;

        let attribute = self.register_type(TypeEntry::abstract_class("Attribute").in_namespace("System"))?;
        self.set_well_known(WellKnownType::Attribute, attribute);

        let activator = self.register_type(TypeEntry::class("Activator").in_namespace("System"))?;
        self.set_well_known(WellKnownType::Activator, activator);
        self.register_procedure(
            ProcedureEntry::method(
                activator,
                "CreateInstance",
                vec![ParamEntry::new("type", type_ty)],
                object.clone(),
            )
            .shared(),
        )?;

        self.register_delegates()?;

        // === Interop ===
        let missing = self.register_type(TypeEntry::class("Missing").in_namespace("System.Reflection"))?;
        self.set_well_known(WellKnownType::Missing, missing);
        self.register_field(FieldEntry::new(missing, "Value", DataType::named(missing)).shared().read_only())?;

        for (name, role) in [
            ("DispatchWrapper", WellKnownType::DispatchWrapper),
            ("UnknownWrapper", WellKnownType::UnknownWrapper),
        ] {
            let hash = self.register_type(TypeEntry::class(name).in_namespace("System.Runtime.InteropServices"))?;
            self.set_well_known(role, hash);
            self.register_procedure(ProcedureEntry::constructor(hash, vec![ParamEntry::new("obj", object.clone())]))?;
        }

        self.register_collections()?;
        self.register_tasks()?;

        // === XML ===
        let element = self.register_type(TypeEntry::class("XElement").in_namespace("System.Xml.Linq"))?;
        self.set_well_known(WellKnownType::XElement, element);
        self.register_procedure(ProcedureEntry::constructor(
            element,
            vec![
                ParamEntry::new("name", string),
                ParamEntry::param_array("content", object),
            ],
        ))?;

        Ok(())
    }

    /// `Func(Of TResult)` .. `Func(Of T1, T2, TResult)` and `Action` .. `Action(Of T1, T2)`.
    fn register_delegates(&mut self) -> Result<(), RegistrationError> {
        for inputs in 0..=2u32 {
            let mut func = TypeEntry::delegate("Func").in_namespace("System");
            for i in 0..inputs {
                func = func.with_generic_param(GenericParamEntry::contravariant(format!("T{}", i + 1)));
            }
            func = func.with_generic_param(GenericParamEntry::covariant("TResult"));
            let params = (0..inputs)
                .map(|i| ParamEntry::new(&format!("arg{}", i + 1), func.generic_param(i)))
                .collect();
            let result = func.generic_param(inputs);
            let hash = self.register_type(func)?;
            self.register_procedure(ProcedureEntry::method(hash, "Invoke", params, result))?;

            let mut action = TypeEntry::delegate("Action").in_namespace("System");
            for i in 0..inputs {
                action = action.with_generic_param(GenericParamEntry::contravariant(format!("T{}", i + 1)));
            }
            let params = (0..inputs)
                .map(|i| ParamEntry::new(&format!("arg{}", i + 1), action.generic_param(i)))
                .collect();
            let hash = self.register_type(action)?;
            self.register_procedure(ProcedureEntry::sub(hash, "Invoke", params))?;
        }
        Ok(())
    }

    /// `IEnumerable(Of T)`, `List(Of T)` and the query operators.
    fn register_collections(&mut self) -> Result<(), RegistrationError> {
        let enumerable = TypeEntry::interface("IEnumerable")
            .in_namespace("System.Collections.Generic")
            .with_generic_param(GenericParamEntry::covariant("T"));
        let enumerable = self.register_type(enumerable)?;
        self.set_well_known(WellKnownType::GenericEnumerable, enumerable);

        let list = TypeEntry::class("List")
            .in_namespace("System.Collections.Generic")
            .with_generic_param(GenericParamEntry::new("T"))
            .with_default_member("Item");
        let t = list.generic_param(0);
        let list = self.register_type(
            list.with_interface(DataType::generic(enumerable, vec![t.clone()])),
        )?;
        self.set_well_known(WellKnownType::GenericList, list);
        self.register_procedure(ProcedureEntry::constructor(list, vec![]))?;
        self.register_procedure(ProcedureEntry::sub(list, "Add", vec![ParamEntry::new("item", t.clone())]))?;
        self.register_property(PropertyEntry::read_only(list, "Count", DataType::integer()))?;
        self.register_property(PropertyEntry::indexed(
            list,
            "Item",
            vec![ParamEntry::new("index", DataType::integer())],
            t,
        ))?;

        let linq = self.register_type(TypeEntry::module("Enumerable").in_namespace("System.Linq"))?;
        let seq = |arg: DataType| DataType::generic(enumerable, vec![arg]);

        // Where(Of T)(source As IEnumerable(Of T), predicate As Func(Of T, Boolean)) As IEnumerable(Of T)
        let owner = ProcedureEntry::generic_owner_for(linq, "Where", 1);
        let t = DataType::GenericParam { owner, index: 0 };
        if let Some(predicate) = self.func_type(vec![t.clone(), DataType::boolean()]) {
            self.register_procedure(
                ProcedureEntry::method(
                    linq,
                    "Where",
                    vec![ParamEntry::new("source", seq(t.clone())), ParamEntry::new("predicate", predicate)],
                    seq(t),
                )
                .with_generic_params(vec![GenericParamEntry::new("TSource")])
                .extension(),
            )?;
        }

        // Select(Of T, R)(source As IEnumerable(Of T), selector As Func(Of T, R)) As IEnumerable(Of R)
        let owner = ProcedureEntry::generic_owner_for(linq, "Select", 2);
        let t = DataType::GenericParam { owner, index: 0 };
        let r = DataType::GenericParam { owner, index: 1 };
        if let Some(selector) = self.func_type(vec![t.clone(), r.clone()]) {
            self.register_procedure(
                ProcedureEntry::method(
                    linq,
                    "Select",
                    vec![ParamEntry::new("source", seq(t)), ParamEntry::new("selector", selector)],
                    seq(r),
                )
                .with_generic_params(vec![GenericParamEntry::new("TSource"), GenericParamEntry::new("TResult")])
                .extension(),
            )?;
        }

        for name in ["OrderBy", "OrderByDescending"] {
            let owner = ProcedureEntry::generic_owner_for(linq, name, 2);
            let t = DataType::GenericParam { owner, index: 0 };
            let k = DataType::GenericParam { owner, index: 1 };
            if let Some(key) = self.func_type(vec![t.clone(), k]) {
                self.register_procedure(
                    ProcedureEntry::method(
                        linq,
                        name,
                        vec![ParamEntry::new("source", seq(t.clone())), ParamEntry::new("keySelector", key)],
                        seq(t),
                    )
                    .with_generic_params(vec![GenericParamEntry::new("TSource"), GenericParamEntry::new("TKey")])
                    .extension(),
                )?;
            }
        }
        Ok(())
    }

    /// `Task`, `Task(Of T)`, their awaiters and the notification interface.
    fn register_tasks(&mut self) -> Result<(), RegistrationError> {
        let notify = self.register_type(
            TypeEntry::interface("INotifyCompletion").in_namespace("System.Runtime.CompilerServices"),
        )?;
        self.set_well_known(WellKnownType::NotifyCompletion, notify);
        if let Some(action) = self.action_type(vec![]) {
            self.register_procedure(ProcedureEntry::sub(
                notify,
                "OnCompleted",
                vec![ParamEntry::new("continuation", action)],
            ))?;
        }

        let awaiter = self.register_type(
            TypeEntry::structure("TaskAwaiter")
                .in_namespace("System.Runtime.CompilerServices")
                .with_interface(DataType::named(notify)),
        )?;
        self.register_property(PropertyEntry::read_only(awaiter, "IsCompleted", DataType::boolean()))?;
        self.register_procedure(ProcedureEntry::sub(awaiter, "GetResult", vec![]))?;

        let generic_awaiter = TypeEntry::structure("TaskAwaiter")
            .in_namespace("System.Runtime.CompilerServices")
            .with_generic_param(GenericParamEntry::new("TResult"))
            .with_interface(DataType::named(notify));
        let result = generic_awaiter.generic_param(0);
        let generic_awaiter = self.register_type(generic_awaiter)?;
        self.register_property(PropertyEntry::read_only(generic_awaiter, "IsCompleted", DataType::boolean()))?;
        self.register_procedure(ProcedureEntry::method(generic_awaiter, "GetResult", vec![], result))?;

        let task = self.register_type(TypeEntry::class("Task").in_namespace("System.Threading.Tasks"))?;
        self.register_procedure(ProcedureEntry::method(task, "GetAwaiter", vec![], DataType::named(awaiter)))?;

        let generic_task = TypeEntry::class("Task")
            .in_namespace("System.Threading.Tasks")
            .with_generic_param(GenericParamEntry::new("TResult"));
        let result = generic_task.generic_param(0);
        let generic_task = self.register_type(generic_task.with_base(DataType::named(task)))?;
        self.register_procedure(ProcedureEntry::method(
            generic_task,
            "GetAwaiter",
            vec![],
            DataType::generic(generic_awaiter, vec![result]),
        ))?;
        Ok(())
    }

    /// `Task(Of result)`, if registered.
    pub fn task_of(&self, result: DataType) -> Option<DataType> {
        self.type_by_name("System.Threading.Tasks.Task", 1)
            .map(|entry| DataType::generic(entry.hash, vec![result]))
    }

    /// Non-generic `Task`, if registered.
    pub fn task(&self) -> Option<DataType> {
        self.type_by_name("System.Threading.Tasks.Task", 0)
            .map(|entry| DataType::named(entry.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::MemberRef;

    #[test]
    fn runtime_registers_roles() {
        let table = SymbolTable::with_runtime().unwrap();
        assert_eq!(table.well_known_type(WellKnownType::Object), Some(DataType::Object));
        assert!(table.well_known(WellKnownType::XElement).is_some());
        assert!(table.func_type(vec![DataType::integer(), DataType::boolean()]).is_some());
        assert!(table.action_type(vec![]).is_some());
    }

    #[test]
    fn string_exposes_concat_overloads() {
        let table = SymbolTable::with_runtime().unwrap();
        let concat = table.lookup_member(&DataType::string(), "Concat");
        assert_eq!(concat.len(), 4);
        assert!(matches!(
            table.lookup_member(&DataType::string(), "Length")[..],
            [MemberRef::Property(_)]
        ));
        assert_eq!(table.default_member(&DataType::string()), Some("Chars"));
    }

    #[test]
    fn object_members_reach_every_type() {
        let table = SymbolTable::with_runtime().unwrap();
        assert_eq!(table.lookup_member(&DataType::integer(), "ToString").len(), 1);
        assert_eq!(table.lookup_member(&DataType::array(DataType::integer(), 1), "Length").len(), 1);
    }

    #[test]
    fn arrays_implement_generic_enumerable() {
        let table = SymbolTable::with_runtime().unwrap();
        let seq = table.well_known(WellKnownType::GenericEnumerable).unwrap();
        let ints = DataType::array(DataType::integer(), 1);
        assert!(table.implements_interface(&ints, &DataType::generic(seq, vec![DataType::integer()])));
    }

    #[test]
    fn list_instantiates_enumerable() {
        let table = SymbolTable::with_runtime().unwrap();
        let list = table.well_known(WellKnownType::GenericList).unwrap();
        let seq = table.well_known(WellKnownType::GenericEnumerable).unwrap();
        let strings = DataType::generic(list, vec![DataType::string()]);
        assert_eq!(table.instantiation_of(&strings, seq), Some(vec![DataType::string()]));
    }

    #[test]
    fn query_operators_are_extensions() {
        let table = SymbolTable::with_runtime().unwrap();
        for name in ["Where", "Select", "OrderBy", "OrderByDescending"] {
            let found = table.extension_methods(name);
            assert_eq!(found.len(), 1, "{name}");
            assert!(found[0].is_generic());
        }
    }

    #[test]
    fn generic_task_awaiter_result() {
        let table = SymbolTable::with_runtime().unwrap();
        let task = table.task_of(DataType::integer()).unwrap();
        let [MemberRef::Procedure(get_awaiter)] = table.lookup_member(&task, "GetAwaiter")[..] else {
            panic!("expected one GetAwaiter");
        };
        let get_awaiter = table.get_procedure(get_awaiter).unwrap();
        let awaiter = table.member_type(&task, get_awaiter.owner, &get_awaiter.return_type);
        let notify = table.well_known_type(WellKnownType::NotifyCompletion).unwrap();
        assert!(table.implements_interface(&awaiter, &notify));
    }
}
