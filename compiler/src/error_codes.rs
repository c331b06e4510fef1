//! Error code registry for the type loader
//!
//! Every diagnostic the loader emits carries a stable code so tooling can match
//! on it without parsing messages.
//!
//! # Error Code Ranges
//!
//! - E1000-E1099: Structure types
//! - E1100-E1199: Class heritage
//! - E1200-E1299: Class fields
//! - E1500-E1599: Overriding
//! - E1600-E1699: Interface and abstract class conformance
//! - E1700-E1799: Final field initialization
//! - E2000-E2999: Type and module resolution
//! - E3000-E3999: Type parameters and constraints
//! - E4000-E4999: Build scheduling
//! - E5000-E5999: Warnings

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub code: u16,
    pub category: &'static str,
    pub description: &'static str,
    /// Suggestion shown under the diagnostic
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            category,
            description,
            help,
        }
    }

    /// Formats as "E{code:04}", e.g. "E1501"
    pub fn format_code(&self) -> String {
        format_error_code(self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.format_code(),
            self.category,
            self.description
        )
    }
}

pub const DUPLICATE_STRUCTURE_FIELD: u16 = 1001;
pub const FIELD_REDEFINITION: u16 = 1002;
pub const EXPLICIT_TYPE_REQUIRED: u16 = 1003;
pub const VOID_STRUCTURE_FIELD: u16 = 1004;
pub const INVALID_STRUCTURE_ACCESS: u16 = 1005;
pub const EXPRESSION_IN_STRUCTURE: u16 = 1006;
pub const CUSTOM_PROPERTY_ACCESSOR: u16 = 1007;
pub const EXTEND_NON_STRUCTURE: u16 = 1008;
pub const LOOP_IN_DEFINITION: u16 = 1009;

pub const INVALID_SUPERCLASS: u16 = 1101;
pub const INVALID_INTERFACE: u16 = 1102;
pub const RECURSIVE_CLASS: u16 = 1103;
pub const EXTEND_FINAL_CLASS: u16 = 1104;
pub const INVALID_SPECIAL_HERITAGE: u16 = 1105;

pub const DUPLICATE_CLASS_FIELD: u16 = 1201;
pub const INVALID_ABSTRACT_METHOD: u16 = 1202;

pub const MISSING_OVERRIDE: u16 = 1501;
pub const OVERRIDE_WITHOUT_PARENT: u16 = 1502;
pub const INVALID_OVERRIDE: u16 = 1503;
pub const INCOMPATIBLE_OVERRIDE: u16 = 1504;

pub const INTERFACE_FIELD_MISMATCH: u16 = 1601;
pub const MISSING_INTERFACE_FIELDS: u16 = 1602;
pub const MISSING_ABSTRACT_IMPLEMENTATIONS: u16 = 1603;

pub const UNINITIALIZED_FINAL: u16 = 1701;

pub const MODULE_NOT_FOUND: u16 = 2001;
pub const TYPE_NOT_FOUND: u16 = 2002;
pub const DUPLICATE_TYPE: u16 = 2003;

pub const TYPE_PARAMETER_COUNT: u16 = 3001;
pub const CONSTANT_TYPE_PARAMETER: u16 = 3002;
pub const INVALID_TYPE_PARAMETER: u16 = 3003;
pub const CONSTRAINT_FAILURE: u16 = 3004;

pub const BUILD_RETRIES_EXHAUSTED: u16 = 4001;
pub const CUSTOM_ERROR: u16 = 4999;

pub const UNUSED_IMPORT: u16 = 5001;
pub const SKIPPED_HERITAGE: u16 = 5002;

/// All codes the loader knows about
pub struct ErrorCodeRegistry {
    codes: HashMap<u16, ErrorCode>,
}

impl ErrorCodeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            codes: HashMap::new(),
        };
        registry.register_all_codes();
        registry
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Looks up "E1501" style strings
    pub fn get_by_string(&self, code_str: &str) -> Option<&ErrorCode> {
        parse_error_code(code_str).and_then(|code| self.get(code))
    }

    fn register(&mut self, error_code: ErrorCode) {
        self.codes.insert(error_code.code, error_code);
    }

    fn register_all_codes(&mut self) {
        // Structures
        self.register(ErrorCode::new(
            DUPLICATE_STRUCTURE_FIELD,
            "Structure",
            "Duplicate structure field",
            Some("Each field of an anonymous structure needs a unique name"),
        ));
        self.register(ErrorCode::new(
            FIELD_REDEFINITION,
            "Structure",
            "Field redefined with a different type",
            Some("Fields merged from several structures must agree on their type"),
        ));
        self.register(ErrorCode::new(
            EXPLICIT_TYPE_REQUIRED,
            "Structure",
            "Explicit type required",
            Some("Add a type hint to the field or argument"),
        ));
        self.register(ErrorCode::new(
            VOID_STRUCTURE_FIELD,
            "Structure",
            "Void structure field",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_STRUCTURE_ACCESS,
            "Structure",
            "Invalid access modifier on structure field",
            Some("Only public, private, dynamic and final are allowed on structure fields"),
        ));
        self.register(ErrorCode::new(
            EXPRESSION_IN_STRUCTURE,
            "Structure",
            "Expression in structure field",
            Some("Structure fields declare types only; remove the initializer or body"),
        ));
        self.register(ErrorCode::new(
            CUSTOM_PROPERTY_ACCESSOR,
            "Structure",
            "Custom property accessor",
            Some("Use `get` or `set` and name the accessor get_<field> / set_<field>"),
        ));
        self.register(ErrorCode::new(
            EXTEND_NON_STRUCTURE,
            "Structure",
            "Structural extension of a non-structure",
            None,
        ));
        self.register(ErrorCode::new(
            LOOP_IN_DEFINITION,
            "Structure",
            "Cyclic structure definition",
            Some("Break the cycle between the extending typedefs"),
        ));

        // Heritage
        self.register(ErrorCode::new(
            INVALID_SUPERCLASS,
            "Heritage",
            "Invalid superclass",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_INTERFACE,
            "Heritage",
            "Invalid implemented interface",
            None,
        ));
        self.register(ErrorCode::new(
            RECURSIVE_CLASS,
            "Heritage",
            "Recursive class hierarchy",
            None,
        ));
        self.register(ErrorCode::new(
            EXTEND_FINAL_CLASS,
            "Heritage",
            "Extending a final class",
            Some("Remove the final modifier from the parent or use composition"),
        ));
        self.register(ErrorCode::new(
            INVALID_SPECIAL_HERITAGE,
            "Heritage",
            "Invalid ArrayAccess or Dynamic heritage",
            None,
        ));

        // Class fields
        self.register(ErrorCode::new(
            DUPLICATE_CLASS_FIELD,
            "Field",
            "Duplicate class field",
            Some("Mark both declarations with `overload` to declare overloads"),
        ));
        self.register(ErrorCode::new(
            INVALID_ABSTRACT_METHOD,
            "Field",
            "Invalid abstract method",
            None,
        ));

        // Overriding
        self.register(ErrorCode::new(
            MISSING_OVERRIDE,
            "Override",
            "Missing override modifier",
            Some("Add `override` to the redefined field"),
        ));
        self.register(ErrorCode::new(
            OVERRIDE_WITHOUT_PARENT,
            "Override",
            "Override without a parent field",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_OVERRIDE,
            "Override",
            "Invalid override",
            None,
        ));
        self.register(ErrorCode::new(
            INCOMPATIBLE_OVERRIDE,
            "Override",
            "Override with incompatible type",
            Some("Return types may narrow and argument types may widen, nothing else may change"),
        ));

        // Conformance
        self.register(ErrorCode::new(
            INTERFACE_FIELD_MISMATCH,
            "Conformance",
            "Interface field mismatch",
            None,
        ));
        self.register(ErrorCode::new(
            MISSING_INTERFACE_FIELDS,
            "Conformance",
            "Missing interface fields",
            Some("Implement the listed fields or make the class abstract"),
        ));
        self.register(ErrorCode::new(
            MISSING_ABSTRACT_IMPLEMENTATIONS,
            "Conformance",
            "Missing implementations of abstract fields",
            Some("Implement the listed fields or make the class abstract as well"),
        ));

        // Finals
        self.register(ErrorCode::new(
            UNINITIALIZED_FINAL,
            "Final",
            "Uninitialized final field",
            Some("Assign the field where it is declared or in the constructor"),
        ));

        // Resolution
        self.register(ErrorCode::new(
            MODULE_NOT_FOUND,
            "Resolution",
            "Module not found",
            None,
        ));
        self.register(ErrorCode::new(
            TYPE_NOT_FOUND,
            "Resolution",
            "Type not found",
            Some("Check the spelling and the imports of this module"),
        ));
        self.register(ErrorCode::new(
            DUPLICATE_TYPE,
            "Resolution",
            "Duplicate type in module",
            None,
        ));

        // Type parameters
        self.register(ErrorCode::new(
            TYPE_PARAMETER_COUNT,
            "Generic",
            "Wrong number of type parameters",
            None,
        ));
        self.register(ErrorCode::new(
            CONSTANT_TYPE_PARAMETER,
            "Generic",
            "Constant and type arguments mixed up",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_TYPE_PARAMETER,
            "Generic",
            "Invalid type parameter declaration",
            None,
        ));
        self.register(ErrorCode::new(
            CONSTRAINT_FAILURE,
            "Generic",
            "Constraint check failure",
            None,
        ));

        // Scheduling
        self.register(ErrorCode::new(
            BUILD_RETRIES_EXHAUSTED,
            "Build",
            "Build never completed",
            Some("A dependency cycle keeps cancelling this build"),
        ));
        self.register(ErrorCode::new(CUSTOM_ERROR, "Build", "Error", None));

        // Warnings
        self.register(ErrorCode::new(
            UNUSED_IMPORT,
            "Warning",
            "Unused import",
            Some("Remove the import"),
        ));
        self.register(ErrorCode::new(
            SKIPPED_HERITAGE,
            "Warning",
            "Unresolved parent skipped in display mode",
            None,
        ));
    }

    /// All codes in `start..=end`, sorted
    pub fn get_range(&self, start: u16, end: u16) -> Vec<&ErrorCode> {
        let mut codes: Vec<&ErrorCode> = self
            .codes
            .values()
            .filter(|code| code.code >= start && code.code <= end)
            .collect();
        codes.sort_by_key(|code| code.code);
        codes
    }

    pub fn is_valid_code(&self, code: u16) -> bool {
        self.codes.contains_key(&code)
    }
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

pub fn get_error_code(code: u16) -> Option<&'static ErrorCode> {
    error_registry().get(code)
}

/// 1501 -> "E1501"
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// "E1501" -> Some(1501)
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str.strip_prefix('E')?.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_creation() {
        let code = ErrorCode::new(1501, "Override", "Missing override modifier", None);
        assert_eq!(code.format_code(), "E1501");
        assert_eq!(code.to_string(), "E1501 [Override]: Missing override modifier");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ErrorCodeRegistry::new();
        let missing = registry.get(MISSING_OVERRIDE).unwrap();
        assert_eq!(missing.category, "Override");
        assert_eq!(registry.get_by_string("E2002").unwrap().code, TYPE_NOT_FOUND);
        assert!(registry.get(65535).is_none());
        assert!(registry.get_by_string("INVALID").is_none());
    }

    #[test]
    fn test_ranges_are_disjoint() {
        let registry = error_registry();
        let overrides = registry.get_range(1500, 1599);
        assert_eq!(overrides.len(), 4);
        assert!(registry
            .get_range(5000, 5999)
            .iter()
            .all(|c| c.category == "Warning"));
    }

    #[test]
    fn test_helper_functions() {
        assert_eq!(format_error_code(42), "E0042");
        assert_eq!(parse_error_code("E1001"), Some(1001));
        assert_eq!(parse_error_code("1001"), None);
        assert!(get_error_code(UNUSED_IMPORT).is_some());
    }
}
