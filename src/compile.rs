//! The schema compiler proper.
//!
//! [`Context`] carries the run-scoped state: the root schema node, the two
//! output sinks, the generated class name, the local-name allocator and the
//! definition table. [`Context::validate_node`] is the recursive descent
//! that lowers each schema construct into C++ validation logic;
//! [`compile_schema`] is the in-memory driver wrapping it with the prelude,
//! the definition-materialisation pass and the root call operator.

use std::collections::HashMap;

use crate::diag::{Diagnostics, Severity};
use crate::emit::Sink;
use crate::node::{Document, Kind, NodeRef};
use crate::resolve::locate;
use crate::types::{
    Property, SchemaType, TypeSet, ARRAY_PROPS, OBJECT_PROPS, REF_KEY, VALID_TYPE_NAMES,
};

macro_rules! src_out {
    ($ctx:expr, $($arg:tt)*) => { $ctx.src.write(&format!($($arg)*)) };
}

macro_rules! hdr_out {
    ($ctx:expr, $($arg:tt)*) => { $ctx.hdr.write(&format!($($arg)*)) };
}

/// Hand-written runtime support injected verbatim ahead of any validator
/// body: deep node equality plus the seven type predicates.
const RUNTIME_PRELUDE: &str = r#"
namespace {

bool
equal(const YAML::Node &lhs, const YAML::Node &rhs)
{
  if (lhs.Type() != rhs.Type()) {
    return false;
  }
  if (lhs.IsSequence()) {
    if (lhs.size() != rhs.size()) {
      return false;
    }
    for (std::size_t i = 0, n = lhs.size(); i < n; ++i) {
      if (!equal(lhs[i], rhs[i])) {
        return false;
      }
    }
    return true;
  }
  if (lhs.IsMap()) {
    if (lhs.size() != rhs.size()) {
      return false;
    }
    for (const auto &pair : lhs) {
      if (!rhs[pair.first] || !equal(pair.second, rhs[pair.first])) {
        return false;
      }
    }
    return true;
  }
  return lhs.Scalar() == rhs.Scalar();
}

bool is_null_type(YAML::Node const& node) {
  return node.IsNull();
}

bool is_bool_type(YAML::Node const& node) {
  if (node.IsScalar()) {
    auto && value { node.Scalar() };
    return 0 == strcasecmp("true", value.c_str()) || 0 == strcasecmp("false", value.c_str());
  }
  return false;
}

bool is_array_type(YAML::Node const& node) {
  return node.IsSequence();
}

bool is_object_type(YAML::Node const& node) {
  return node.IsMap();
}

bool is_integer_type(YAML::Node const& node) {
  if (node.IsScalar()) {
    swoc::TextView value { node.Scalar() };
    swoc::TextView parsed;
    if (value.trim_if(&isspace).size() < 1) {
      return false;
    }
    swoc::svtoi(value, &parsed);
    return value.size() == parsed.size();
  }
  return false;
}

bool is_number_type(YAML::Node const& node) {
  if (node.IsScalar()) {
    swoc::TextView value { node.Scalar() };
    swoc::TextView parsed;
    if (value.trim_if(&isspace).size() < 1) {
      return false;
    }
    swoc::svtod(value, &parsed);
    return value.size() == parsed.size();
  }
  return false;
}

bool is_string_type(YAML::Node const& node) {
  return node.IsScalar();
}

} // namespace

"#;

/// Run-scoped compilation state. One instance per run; not reentrant.
pub struct Context<'a> {
    root: NodeRef<'a>,
    src: Sink,
    hdr: Sink,
    class_name: String,
    var_idx: u32,
    /// Original reference string to generated function name. Consulted on
    /// every `$ref`; populated by the materialisation pass.
    definitions: HashMap<String, String>,
}

/// Everything a run produces: the two generated streams plus the channel.
pub struct CompileOutput {
    pub hdr: String,
    pub src: String,
    pub notes: Diagnostics,
}

fn failed(d: &Diagnostics) -> bool {
    d.max_severity() >= Some(Severity::Error)
}

/// `v_` + reference with the leading `#` stripped and every other
/// non-alphanumeric byte replaced by `_`, so `#/definitions/Tree` becomes
/// `v__definitions_Tree`.
fn definition_name(reference: &str) -> String {
    let trimmed = reference.strip_prefix('#').unwrap_or(reference);
    let mut name = String::with_capacity(trimmed.len() + 2);
    name.push_str("v_");
    for c in trimmed.chars() {
        name.push(if c.is_ascii_alphanumeric() { c } else { '_' });
    }
    name
}

fn parse_count(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok().filter(|v| *v >= 0)
}

impl<'a> Context<'a> {
    pub fn new(root: NodeRef<'a>, class_name: &str) -> Context<'a> {
        Context {
            root,
            src: Sink::new(),
            hdr: Sink::new(),
            class_name: class_name.to_string(),
            var_idx: 1,
            definitions: HashMap::new(),
        }
    }

    /// Fresh local name; the namespace is flat across the whole run.
    fn var_name(&mut self) -> String {
        let name = format!("node_{}", self.var_idx);
        self.var_idx += 1;
        name
    }

    // ------------------- definition materialisation ------------------- //

    /// Pre-order pass over the schema tree that turns every reachable `$ref`
    /// target into a standalone validator function before the root body is
    /// emitted. The binding is recorded before recursing into the target so
    /// that cyclic references find the name and emit a call instead of
    /// re-entering.
    fn process_definitions(&mut self, node: NodeRef<'a>) -> Diagnostics {
        let mut erratum = Diagnostics::new();
        match node.kind() {
            Kind::Map => {
                let ref_node = node.get(REF_KEY);
                if ref_node.is_defined() {
                    let reference = ref_node.scalar().to_string();
                    if self.definitions.contains_key(&reference) {
                        return erratum;
                    }
                    match locate(self.root, &reference) {
                        Ok(target) => {
                            let defun = definition_name(&reference);
                            tracing::debug!(reference = %reference, function = %defun,
                                "materialising definition");
                            self.definitions.insert(reference.clone(), defun.clone());
                            // dependencies first, so their functions precede ours
                            erratum.note(self.process_definitions(target));
                            hdr_out!(
                                self,
                                "bool {} (swoc::Errata &erratum, YAML::Node const& node, std::string_view const& name);\n",
                                defun
                            );
                            src_out!(
                                self,
                                "bool {}::Definitions::{} (swoc::Errata &erratum, YAML::Node const& node, std::string_view const& name) {{\n",
                                self.class_name,
                                defun
                            );
                            self.src.indent();
                            let body = self.validate_node(target, "node");
                            src_out!(self, "return true;\n");
                            self.src.exdent();
                            src_out!(self, "}}\n\n");
                            let bad = !body.is_ok();
                            erratum.note(body);
                            if bad {
                                erratum.info(format!(
                                    "Failed to generate definition \"{}\" used at line {}.",
                                    reference,
                                    ref_node.line()
                                ));
                            }
                        }
                        Err(inner) => {
                            erratum.note(inner);
                            erratum.error(format!(
                                "Unable to find ref \"{}\" used at line {}.",
                                reference,
                                ref_node.line()
                            ));
                        }
                    }
                } else {
                    for (_key, value) in node.entries() {
                        erratum.note(self.process_definitions(value));
                    }
                }
            }
            Kind::Sequence => {
                for value in node.items() {
                    erratum.note(self.process_definitions(value));
                }
            }
            _ => {}
        }
        erratum
    }

    // ----------------------------- walker ----------------------------- //

    /// Emit the checks validating a runtime value bound to `var` against
    /// `value`. The generated code returns false on the first failure; the
    /// compile itself keeps going and reports every problem it can.
    pub fn validate_node(&mut self, value: NodeRef<'a>, var: &str) -> Diagnostics {
        let mut zret = Diagnostics::new();
        if value.kind() != Kind::Map {
            zret.error(format!(
                "Value at line {} must be a {}.",
                value.line(),
                SchemaType::Object.name()
            ));
            return zret;
        }

        let ref_node = value.get(REF_KEY);
        if ref_node.is_defined() {
            if value.len() > 1 {
                zret.warn(format!(
                    "Ignoring tags in value at line {} - use of '$ref' tag at line {} requires ignoring all other tags.",
                    value.line(),
                    ref_node.line()
                ));
            }
            match self.definitions.get(ref_node.scalar()) {
                Some(defun) => {
                    let defun = defun.clone();
                    src_out!(self, "if (! defun.{}(erratum, {}, name)) return false;\n", defun, var);
                }
                None => {
                    zret.error(format!(
                        "Invalid '$ref' at line {} in value at line {} - '{}' not found.",
                        ref_node.line(),
                        value.line(),
                        ref_node.scalar()
                    ));
                }
            }
            return zret;
        }

        let mut types = TypeSet::empty();
        let type_node = value.get(Property::Type.name());
        if type_node.is_defined() {
            let result = process_type_value(type_node, &mut types);
            let bad = failed(&result);
            zret.note(result);
            if bad {
                zret.annotate(format!(
                    "Unable to process value at line {} for '{}' at line {}",
                    type_node.line(),
                    Property::Type.name(),
                    value.line()
                ));
                return zret;
            }
            self.emit_type_check(types, var);
        } else {
            types = TypeSet::full();
        }

        if types.contains(SchemaType::Object) {
            let result = self.process_object_value(value, var, types);
            let bad = failed(&result);
            zret.note(result);
            if bad {
                zret.annotate(format!(
                    "Unable to process value at line {} as {}",
                    value.line(),
                    SchemaType::Object.name()
                ));
                return zret;
            }
        }

        if types.contains(SchemaType::Array) {
            let result = self.process_array_value(value, var, types);
            let bad = failed(&result);
            zret.note(result);
            if bad {
                zret.annotate(format!("Unable to process value at line {}", value.line()));
                return zret;
            }
        }

        let any_of = value.get(Property::AnyOf.name());
        if any_of.is_defined() {
            let result = self.process_any_of_value(any_of, var);
            let bad = failed(&result);
            zret.note(result);
            if bad {
                return zret;
            }
        }

        let one_of = value.get(Property::OneOf.name());
        if one_of.is_defined() {
            let result = self.process_one_of_value(one_of, var);
            let bad = failed(&result);
            zret.note(result);
            if bad {
                return zret;
            }
        }

        let enum_node = value.get(Property::Enum.name());
        if enum_node.is_defined() {
            let result = self.process_enum_value(enum_node, var);
            let bad = failed(&result);
            zret.note(result);
            if bad {
                return zret;
            }
        }

        zret
    }

    // ------------------------ emit helpers ---------------------------- //

    fn emit_type_check(&mut self, types: TypeSet, var: &str) {
        src_out!(self, "// validate value type\n");
        if types.count() == 1 {
            let t = types.iter().next().expect("non-empty type set");
            src_out!(
                self,
                "if (! {}({})) {{ erratum.error(\"'{{}}' value at line {{}} was not {}\", name, {}.Mark().line); return false; }}\n",
                t.predicate(),
                var,
                t.name(),
                var
            );
        } else {
            let preds = types
                .iter()
                .map(|t| format!("{}({})", t.predicate(), var))
                .collect::<Vec<_>>()
                .join(" || ");
            src_out!(self, "if (! ({})) {{\n", preds);
            self.src.indent();
            let names = types
                .iter()
                .map(|t| format!("'{}'", t.name()))
                .collect::<Vec<_>>()
                .join(", ");
            src_out!(
                self,
                "erratum.error(\"value at line {{}} was not one of the required types {}\", {}.Mark().line);\nreturn false;\n",
                names,
                var
            );
            self.src.exdent();
            src_out!(self, "}}\n");
        }
    }

    fn emit_required_check(&mut self, node: NodeRef<'a>, var: &str) {
        src_out!(self, "// check for required tags\nfor ( auto && tag : {{ ");
        let mut delimiter = "";
        for key in node.items() {
            src_out!(self, "{}\"{}\"", delimiter, key.scalar());
            delimiter = ", ";
        }
        src_out!(self, " }} ) {{\n");
        self.src.indent();
        src_out!(self, "if (!{}[tag]) {{\n", var);
        self.src.indent();
        src_out!(
            self,
            "erratum.error(\"Required tag '{{}}' at line {{}} was not found.\", tag, {}.Mark().line);\nreturn false;\n",
            var
        );
        self.src.exdent();
        src_out!(self, "}}\n");
        self.src.exdent();
        src_out!(self, "}}\n");
    }

    fn emit_min_items_check(&mut self, var: &str, limit: i64) {
        src_out!(
            self,
            "if ({}.size() < {}) {{ erratum.error(\"Array at line {{}} has only {{}} items instead of the required {} items\", {}.Mark().line, {}.size()); return false; }}\n",
            var,
            limit,
            limit,
            var,
            var
        );
    }

    fn emit_max_items_check(&mut self, var: &str, limit: i64) {
        src_out!(
            self,
            "if ({}.size() > {}) {{ erratum.error(\"Array at line {{}} has {{}} items instead of the maximum {} items\", {}.Mark().line, {}.size()); return false; }}\n",
            var,
            limit,
            limit,
            var,
            var
        );
    }

    // ------------------------ object properties ----------------------- //

    fn process_object_value(&mut self, node: NodeRef<'a>, var: &str, types: TypeSet) -> Diagnostics {
        let has_tags = OBJECT_PROPS.iter().any(|p| node.get(p.name()).is_defined());
        if !has_tags {
            return Diagnostics::new();
        }
        // A single permitted type means the discrimination check already
        // proved the shape; otherwise the object checks apply only when the
        // runtime value happens to be an object.
        let guard = types.count() != 1;
        if guard {
            src_out!(self, "if ({}({})) {{\n", SchemaType::Object.predicate(), var);
            self.src.indent();
        }
        let zret = self.object_checks(node, var);
        if guard {
            self.src.exdent();
            src_out!(self, "}}\n");
        }
        zret
    }

    fn object_checks(&mut self, node: NodeRef<'a>, var: &str) -> Diagnostics {
        let mut zret = Diagnostics::new();
        let required = node.get(Property::Required.name());
        if required.is_defined() {
            if required.kind() != Kind::Sequence {
                zret.error(format!(
                    "'{}' value at line {} is not type {}.",
                    Property::Required.name(),
                    required.line(),
                    SchemaType::Array.name()
                ));
                return zret;
            }
            for entry in required.items() {
                if !matches!(entry.kind(), Kind::Scalar | Kind::Bool) {
                    zret.error(format!(
                        "'{}' value at line {} has a non-scalar entry at line {}.",
                        Property::Required.name(),
                        required.line(),
                        entry.line()
                    ));
                    return zret;
                }
            }
            self.emit_required_check(required, var);
        }
        let properties = node.get(Property::Properties.name());
        if properties.is_defined() {
            if properties.kind() != Kind::Map {
                zret.error(format!(
                    "'{}' value at line {} is not type {}.",
                    Property::Properties.name(),
                    properties.line(),
                    SchemaType::Object.name()
                ));
                return zret;
            }
            for (key, schema) in properties.entries() {
                let nvar = self.var_name();
                src_out!(self, "if ({}[\"{}\"]) {{\n", var, key.scalar());
                self.src.indent();
                src_out!(self, "auto {} = {}[\"{}\"];\n", nvar, var, key.scalar());
                zret.note(self.validate_node(schema, &nvar));
                self.src.exdent();
                src_out!(self, "}}\n");
            }
        }
        zret
    }

    // ------------------------- array properties ----------------------- //

    fn process_array_value(&mut self, node: NodeRef<'a>, var: &str, types: TypeSet) -> Diagnostics {
        let has_tags = ARRAY_PROPS.iter().any(|p| node.get(p.name()).is_defined());
        if !has_tags {
            return Diagnostics::new();
        }
        let guard = types.count() != 1;
        if guard {
            src_out!(self, "if ({}({})) {{\n", SchemaType::Array.predicate(), var);
            self.src.indent();
        }
        let mut zret = self.array_checks(node, var);
        if guard {
            self.src.exdent();
            src_out!(self, "}}\n");
        }
        if !zret.is_empty() {
            zret.annotate(format!(
                "Problems processing '{}' at line {}",
                Property::Type.name(),
                node.line()
            ));
        }
        zret
    }

    fn array_checks(&mut self, node: NodeRef<'a>, var: &str) -> Diagnostics {
        let mut zret = Diagnostics::new();
        let mut min_items: i64 = 0;
        let mut max_items: i64 = i64::MAX;

        let min_node = node.get(Property::MinItems.name());
        if min_node.is_defined() {
            match parse_count(min_node.scalar()) {
                Some(value) => min_items = value,
                None => {
                    zret.error(format!(
                        "{} value '{}' at line {} for type {} at line {} is invalid - it must be a positive integer.",
                        Property::MinItems.name(),
                        min_node.scalar().trim(),
                        min_node.line(),
                        SchemaType::Array.name(),
                        node.line()
                    ));
                    return zret;
                }
            }
        }
        let max_node = node.get(Property::MaxItems.name());
        if max_node.is_defined() {
            match parse_count(max_node.scalar()) {
                Some(value) => max_items = value,
                None => {
                    zret.error(format!(
                        "{} value '{}' at line {} for type {} at line {} is invalid - it must be a positive integer.",
                        Property::MaxItems.name(),
                        max_node.scalar().trim(),
                        max_node.line(),
                        SchemaType::Array.name(),
                        node.line()
                    ));
                    return zret;
                }
            }
        }
        if min_items > max_items {
            zret.error(format!(
                "For '{}' value at line {}, the '{}' value at line {} is larger than the '{}' value at line {}.",
                SchemaType::Array.name(),
                node.line(),
                Property::MinItems.name(),
                min_node.line(),
                Property::MaxItems.name(),
                max_node.line()
            ));
            return zret;
        }
        if min_node.is_defined() {
            self.emit_min_items_check(var, min_items);
        }
        if max_node.is_defined() {
            self.emit_max_items_check(var, max_items);
        }

        let items = node.get(Property::Items.name());
        if items.is_defined() {
            match items.kind() {
                Kind::Map => {
                    // one schema for every element
                    let nvar = self.var_name();
                    src_out!(self, "for ( auto && {} : {} ) {{\n", nvar, var);
                    self.src.indent();
                    let result = self.validate_node(items, &nvar);
                    let bad = failed(&result);
                    zret.note(result);
                    self.src.exdent();
                    src_out!(self, "}}\n");
                    if bad {
                        zret.annotate(format!(
                            "Failed processing '{}' value for '{}' at line {}.",
                            SchemaType::Object.name(),
                            Property::Type.name(),
                            node.line()
                        ));
                        return zret;
                    }
                }
                Kind::Sequence => {
                    let result = self.tuple_items(node, items, var, min_items, max_items);
                    let bad = failed(&result);
                    zret.note(result);
                    if bad {
                        return zret;
                    }
                }
                _ => {
                    zret.error(format!(
                        "Invalid value for '{}' at line {}: must be a {} or {}.",
                        Property::Items.name(),
                        items.line(),
                        SchemaType::Array.name(),
                        SchemaType::Object.name()
                    ));
                    return zret;
                }
            }
        }
        zret
    }

    /// Positional validation for an `items` sequence. With more schemas than
    /// `maxItems` allows, the surplus is dropped with a warning. When
    /// `minItems` already guarantees the indices exist the validations run
    /// unconditionally; otherwise a size dispatch is emitted whose case arms
    /// deliberately stack without break statements.
    fn tuple_items(
        &mut self,
        node: NodeRef<'a>,
        items: NodeRef<'a>,
        var: &str,
        min_items: i64,
        max_items: i64,
    ) -> Diagnostics {
        let mut zret = Diagnostics::new();
        let max_node = node.get(Property::MaxItems.name());
        let mut limit = items.len();
        if max_node.is_defined() && limit as i64 >= max_items {
            zret.warn(format!(
                "'{}' at line {} has schemas for {} items at line {} but was specified to have at most {} items by line {}. Extra schemas ignored.",
                SchemaType::Array.name(),
                node.line(),
                limit,
                items.line(),
                max_items,
                max_node.line()
            ));
            limit = max_items as usize;
        }
        if limit as i64 <= min_items {
            for idx in 0..limit {
                let nvar = self.var_name();
                src_out!(self, "{{\n");
                self.src.indent();
                src_out!(self, "auto {} = {}[{}];\n", nvar, var, idx);
                let result = self.validate_node(items.at(idx), &nvar);
                let bad = failed(&result);
                zret.note(result);
                self.src.exdent();
                src_out!(self, "}}\n");
                if bad {
                    zret.annotate(format!(
                        "Failed to process item {} in '{}' at line {}.",
                        idx,
                        Property::Items.name(),
                        items.line()
                    ));
                    return zret;
                }
            }
        } else {
            src_out!(self, "switch ({}.size()) {{\n", var);
            self.src.indent();
            let mut failure = false;
            for idx in 0..limit {
                src_out!(self, "case {}: {{\n", idx);
                self.src.indent();
                let nvar = self.var_name();
                src_out!(self, "auto {} = {}[{}];\n", nvar, var, idx);
                let result = self.validate_node(items.at(idx), &nvar);
                let bad = failed(&result);
                zret.note(result);
                self.src.exdent();
                src_out!(self, "}}\n");
                if bad {
                    zret.annotate(format!(
                        "Failed to process value {} at line {} for '{}'.",
                        idx,
                        items.line(),
                        Property::Items.name()
                    ));
                    failure = true;
                    break;
                }
            }
            self.src.exdent();
            src_out!(self, "}}\n");
            if failure {
                return zret;
            }
        }
        zret
    }

    // --------------------- anyOf / oneOf / enum ----------------------- //

    fn process_any_of_value(&mut self, node: NodeRef<'a>, var: &str) -> Diagnostics {
        let mut zret = Diagnostics::new();
        if node.kind() != Kind::Sequence {
            zret.error(format!(
                "'{}' value at line {} is invalid - it must be {} type.",
                Property::AnyOf.name(),
                node.line(),
                SchemaType::Array.name()
            ));
            return zret;
        }
        if node.is_empty() {
            zret.warn(format!(
                "'{}' value at line {} has no items - ignored.",
                Property::AnyOf.name(),
                node.line()
            ));
            return zret;
        }
        src_out!(
            self,
            "// {}\nswoc::Errata any_of_err;\nstd::array<Validator, {}> any_of_verify = {{\n",
            Property::AnyOf.name(),
            node.len()
        );
        self.src.indent();
        for schema in node.items() {
            src_out!(
                self,
                "[&erratum = any_of_err, name, this] (YAML::Node const& node) -> bool {{\n"
            );
            self.src.indent();
            let result = self.validate_node(schema, "node");
            if !result.is_empty() {
                let bad = failed(&result);
                zret.note(result);
                zret.annotate(format!(
                    "Processing '{}' value at line {}",
                    Property::AnyOf.name(),
                    node.line()
                ));
                if bad {
                    return zret;
                }
            }
            src_out!(self, "return true;\n");
            self.src.exdent();
            src_out!(self, "}},\n");
        }
        self.src.exdent();
        src_out!(self, "}};\n");
        src_out!(
            self,
            "if (! std::any_of(any_of_verify.begin(), any_of_verify.end(), [&] (Validator const& vf) {{ return vf({}); }})) {{\n",
            var
        );
        self.src.indent();
        src_out!(
            self,
            "erratum.note(any_of_err);\nerratum.error(\"Node at line {{}} was not valid for any of these schemas.\", {}.Mark().line);\nreturn false;\n",
            var
        );
        self.src.exdent();
        src_out!(self, "}}\n");
        zret
    }

    fn process_one_of_value(&mut self, node: NodeRef<'a>, var: &str) -> Diagnostics {
        let mut zret = Diagnostics::new();
        if node.kind() != Kind::Sequence {
            zret.error(format!(
                "'{}' value at line {} is invalid - it must be {} type.",
                Property::OneOf.name(),
                node.line(),
                SchemaType::Array.name()
            ));
            return zret;
        }
        if node.is_empty() {
            zret.warn(format!(
                "'{}' value at line {} has no items - ignored.",
                Property::OneOf.name(),
                node.line()
            ));
            return zret;
        }
        src_out!(
            self,
            "// {}\nswoc::Errata one_of_err;\nstd::array<Validator, {}> one_of_verify = {{\n",
            Property::OneOf.name(),
            node.len()
        );
        self.src.indent();
        for schema in node.items() {
            src_out!(
                self,
                "[&erratum = one_of_err, name, this] (YAML::Node const& node) -> bool {{\n"
            );
            self.src.indent();
            let result = self.validate_node(schema, "node");
            if !result.is_empty() {
                let bad = failed(&result);
                zret.note(result);
                zret.annotate(format!(
                    "Processing '{}' value at line {}",
                    Property::OneOf.name(),
                    node.line()
                ));
                if bad {
                    return zret;
                }
            }
            src_out!(self, "return true;\n");
            self.src.exdent();
            src_out!(self, "}},\n");
        }
        self.src.exdent();
        src_out!(self, "}};\n");
        src_out!(self, "unsigned one_of_count = 0;\nfor ( auto && vf : one_of_verify ) {{\n");
        self.src.indent();
        src_out!(self, "if (vf({}) && ++one_of_count > 1) {{\n", var);
        self.src.indent();
        src_out!(
            self,
            "erratum.error(\"Node at line {{}} was valid for more than one schema.\", {}.Mark().line);\nreturn false;\n",
            var
        );
        self.src.exdent();
        src_out!(self, "}}\n");
        self.src.exdent();
        src_out!(self, "}}\n");
        src_out!(self, "if (one_of_count != 1) {{\n");
        self.src.indent();
        src_out!(
            self,
            "erratum.note(one_of_err);\nerratum.error(\"'{{}}' value at line {{}} was not valid for any of these schemas.\", name, {}.Mark().line);\nreturn false;\n",
            var
        );
        self.src.exdent();
        src_out!(self, "}}\n");
        zret
    }

    /// Enum values can be of any type, so each is re-serialised to YAML and
    /// reconstituted in the validator, where the prelude's deep equality
    /// does the comparison.
    fn process_enum_value(&mut self, node: NodeRef<'a>, var: &str) -> Diagnostics {
        let mut zret = Diagnostics::new();
        if node.kind() != Kind::Sequence {
            zret.error(format!(
                "'{}' value at line {} is invalid - it must be {} type.",
                Property::Enum.name(),
                node.line(),
                SchemaType::Array.name()
            ));
            return zret;
        }
        if node.is_empty() {
            zret.warn(format!(
                "'{}' value at line {} has no items - ignored.",
                Property::Enum.name(),
                node.line()
            ));
            return zret;
        }
        let mut usage = String::new();
        src_out!(self, "bool enum_match_p = false;\nfor ( auto && vn : {{ ");
        for value in node.items() {
            let form = value.to_yaml();
            src_out!(self, "YAML::Load(R\"uthira({})uthira\"), ", form);
            usage.push_str(&form);
            usage.push_str(", ");
        }
        usage.truncate(usage.len().saturating_sub(2));
        src_out!(self, " }} ) {{\n");
        self.src.indent();
        src_out!(self, "if ( equal(vn, {}) ) {{\n", var);
        self.src.indent();
        src_out!(self, "enum_match_p = true;\nbreak;\n");
        self.src.exdent();
        src_out!(self, "}}\n");
        self.src.exdent();
        src_out!(self, "}}\n");
        src_out!(self, "if (!enum_match_p) {{\n");
        self.src.indent();
        src_out!(
            self,
            "YAML::Emitter yem;\nyem << {};\nerratum.error(\"'{{}}' value '{{}}' at line {{}} is invalid - it must be one of {{}}.\", name, yem.c_str(), {}.Mark().line, R\"uthira({})uthira\");\nreturn false;\n",
            var,
            var,
            usage
        );
        self.src.exdent();
        src_out!(self, "}}\n");
        zret
    }
}

/// Scalar type name (or list of names) to a type set. Reports invalid and
/// duplicated names without aborting the scan.
fn process_type_value(value: NodeRef<'_>, types: &mut TypeSet) -> Diagnostics {
    let mut zret = Diagnostics::new();
    let check = |node: NodeRef<'_>, zret: &mut Diagnostics, types: &mut TypeSet| {
        let name = node.scalar();
        match SchemaType::from_name(name) {
            None => {
                zret.error(format!(
                    "Type value '{}' at line {} is not a valid type. It must be one of {}.",
                    name,
                    node.line(),
                    &*VALID_TYPE_NAMES
                ));
            }
            Some(t) if types.contains(t) => {
                zret.warn(format!(
                    "Type value '{}' at line {} has already been specified.",
                    name,
                    node.line()
                ));
            }
            Some(t) => types.insert(t),
        }
    };
    match value.kind() {
        Kind::Scalar | Kind::Bool => check(value, &mut zret, types),
        Kind::Sequence => {
            for node in value.items() {
                check(node, &mut zret, types);
            }
        }
        _ => {
            zret.error(format!(
                "Type value at line {} must be a string or array of strings but is not.",
                value.line()
            ));
        }
    }
    zret
}

/// One full run over a parsed schema document: preludes, definition
/// materialisation, then the root call operator. Pure text-in/text-out; the
/// CLI owns the files.
pub fn compile_schema(doc: &Document, class_name: &str, hdr_include: &str) -> CompileOutput {
    let root = doc.root();
    let mut ctx = Context::new(root, class_name);
    let mut notes = Diagnostics::new();

    if root.kind() != Kind::Map {
        notes.error("Root node must be a map");
        return CompileOutput {
            hdr: ctx.hdr.into_string(),
            src: ctx.src.into_string(),
            notes,
        };
    }

    tracing::debug!(class = class_name, "emitting preludes");
    src_out!(
        ctx,
        "#include <functional>\n#include <array>\n#include <algorithm>\n#include <iostream>\n\n#include \"{}\"\n\nusing Validator = std::function<bool (YAML::Node const&)>;\n",
        hdr_include
    );
    hdr_out!(
        ctx,
        "#include <string_view>\n\n#include \"swoc/Errata.h\"\n#include \"yaml-cpp/yaml.h\"\n\n"
    );
    hdr_out!(ctx, "class {} {{\npublic:\n", class_name);
    ctx.hdr.indent();
    hdr_out!(ctx, "swoc::Errata erratum;\n");
    hdr_out!(ctx, "bool operator()(const YAML::Node &n);\n\n");

    ctx.src.write(RUNTIME_PRELUDE);

    hdr_out!(ctx, "struct Definitions {{\n");
    ctx.hdr.indent();
    notes.note(ctx.process_definitions(root));
    ctx.hdr.exdent();
    hdr_out!(ctx, "}} defun;\n");
    ctx.hdr.exdent();
    hdr_out!(ctx, "}};\n");

    tracing::debug!(definitions = ctx.definitions.len(), "emitting root validator");
    src_out!(ctx, "bool {}::operator()(YAML::Node const& node) {{\n", class_name);
    ctx.src.indent();
    src_out!(ctx, "static constexpr std::string_view name {{\"root\"}};\n");
    src_out!(ctx, "erratum.clear();\n\n");
    notes.note(ctx.validate_node(root, "node"));
    src_out!(ctx, "\nreturn erratum.severity() < swoc::Severity::ERROR;\n");
    ctx.src.exdent();
    src_out!(ctx, "}}\n");

    CompileOutput {
        hdr: ctx.hdr.into_string(),
        src: ctx.src.into_string(),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_names_follow_the_sanitisation_rule() {
        assert_eq!(definition_name("#/definitions/Tree"), "v__definitions_Tree");
        assert_eq!(definition_name("#/definitions/ip-acl"), "v__definitions_ip_acl");
        assert_eq!(definition_name("definitions/Tree"), "v_definitions_Tree");
    }

    #[test]
    fn counts_parse_as_trimmed_decimals() {
        assert_eq!(parse_count(" 5 "), Some(5));
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count("-2"), None);
        assert_eq!(parse_count("5x"), None);
        assert_eq!(parse_count(""), None);
    }
}
