#[cfg(test)]
mod structure_tests {
    use crate::syntax::{
        Access, Expr, FieldSyntax, FunctionArg, FunctionSyntax, ModuleSyntax, TypeHint, TypeParamSyntax,
        TypePathHint,
    };
    use crate::tast::tests::test_helpers::*;
    use crate::tast::{FieldFlags, FieldKind, MethodKind, Type, TypeloadContext, VarAccess};

    fn var(name: &str, hint: TypeHint) -> FieldSyntax {
        FieldSyntax::var(name, Some(hint))
    }

    fn anon(fields: Vec<FieldSyntax>) -> TypeHint {
        TypeHint::Anonymous(fields)
    }

    fn extend(bases: &[&str], fields: Vec<FieldSyntax>) -> TypeHint {
        TypeHint::Extend {
            bases: bases.iter().map(|b| TypePathHint::new(b)).collect(),
            fields,
        }
    }

    fn typedefs(defs: Vec<(&str, TypeHint)>) -> ModuleSyntax {
        let mut module = ModuleSyntax::new("Shapes");
        for (name, target) in defs {
            module = module.decl(typedef(name, target));
        }
        module
    }

    fn resolved(ctx: &mut TypeloadContext, name: &str) -> String {
        let decl = decl_named(ctx, name);
        let t = ctx.apply_decl(decl, Vec::new());
        let followed = ctx.follow(&t);
        ctx.type_to_string(&followed)
    }

    #[test]
    fn test_plain_structure() {
        let mut ctx = check(
            vec![typedefs(vec![("Point", anon(vec![var("x", t("Int")), var("y", t("Int"))]))])],
            "Shapes",
        );
        assert_no_errors(&ctx);
        assert_eq!(resolved(&mut ctx, "Point"), "{ x : Int, y : Int }");
    }

    #[test]
    fn test_duplicate_structure_field() {
        let ctx = check(
            vec![typedefs(vec![("Point", anon(vec![var("x", t("Int")), var("x", t("Float"))]))])],
            "Shapes",
        );
        assert_single_error(&ctx, "Duplicate field x");
    }

    #[test]
    fn test_structure_field_rules() {
        let cases = vec![
            (FieldSyntax::var("x", None), "Explicit type required for field x"),
            (var("x", t("Void")), "Fields of type Void are not allowed in structures (field x)"),
            (var("x", t("Int")).with_access(&[Access::Static]), "Invalid access static"),
            (var("x", t("Int")).with_expr(Expr::int(1)), "Expression not allowed here (field x)"),
            (
                FieldSyntax::prop("x", "fetch", "never", Some(t("Int"))),
                "Custom property accessor is no longer supported",
            ),
            (
                FieldSyntax::function(
                    "f",
                    FunctionSyntax::new(vec![FunctionArg::new("a", t("Int"))], None)
                        .with_body(Expr::block(Vec::new())),
                ),
                "Expression not allowed here (field f)",
            ),
        ];
        for (field, expected) in cases {
            let ctx = check(vec![typedefs(vec![("Bad", anon(vec![field]))])], "Shapes");
            assert_single_error(&ctx, expected);
        }
    }

    #[test]
    fn test_structure_method_needs_argument_types() {
        let mut untyped = FunctionArg::new("a", t("Int"));
        untyped.hint = None;
        let ctx = check(
            vec![typedefs(vec![(
                "Bad",
                anon(vec![FieldSyntax::function("f", FunctionSyntax::new(vec![untyped], None))]),
            )])],
            "Shapes",
        );
        assert_single_error(&ctx, "Explicit type required for field f.a");
    }

    #[test]
    fn test_structure_method_needs_return_type() {
        let ctx = check(
            vec![typedefs(vec![(
                "Bad",
                anon(vec![FieldSyntax::function("f", FunctionSyntax::new(Vec::new(), None))]),
            )])],
            "Shapes",
        );
        assert_single_error(&ctx, "Explicit type required for field f");
    }

    #[test]
    fn test_dynamic_structure_method() {
        let mut ctx = context(Vec::new());
        let hint = anon(vec![
            FieldSyntax::function("hook", FunctionSyntax::new(Vec::new(), Some(t("Void"))))
                .with_access(&[Access::Dynamic]),
            FieldSyntax::function("run", FunctionSyntax::new(Vec::new(), Some(t("Void")))),
        ]);
        let Type::Anonymous(id) = ctx.load_complex_type(&hint).unwrap() else {
            panic!("expected a structure");
        };
        let fields = &ctx.anon(id).fields;
        assert_eq!(fields["hook"].kind, FieldKind::Method(MethodKind::Dynamic));
        assert_eq!(fields["run"].kind, FieldKind::Method(MethodKind::Normal));
    }

    #[test]
    fn test_field_kinds() {
        let mut ctx = context(Vec::new());
        let hint = anon(vec![
            var("plain", t("Int")),
            var("frozen", t("Int")).with_access(&[Access::Final]),
            var("maybe", t("Int")).with_meta(":optional"),
            FieldSyntax::prop("computed", "get", "null", Some(t("Int"))),
            var("hidden", t("Int")).with_access(&[Access::Private]),
            FieldSyntax::function(
                "map",
                FunctionSyntax::new(vec![FunctionArg::new("value", t("T"))], Some(t("T")))
                    .with_params(vec![TypeParamSyntax::new("T")]),
            ),
        ]);
        let ty = ctx.load_complex_type(&hint).unwrap();
        let Type::Anonymous(id) = ty else {
            panic!("expected a structure, got {:?}", ty);
        };
        let fields = ctx.anon(id).fields.clone();

        assert_eq!(fields["plain"].kind, FieldKind::PLAIN_VAR);
        assert_eq!(
            fields["frozen"].kind,
            FieldKind::Var {
                read: VarAccess::Normal,
                write: VarAccess::Never
            }
        );
        assert!(fields["frozen"].has_flag(FieldFlags::FINAL));

        assert!(fields["maybe"].has_flag(FieldFlags::OPTIONAL));
        assert_eq!(ctx.type_to_string(&fields["maybe"].ty), "Null<Int>");

        assert_eq!(
            fields["computed"].kind,
            FieldKind::Var {
                read: VarAccess::Call,
                write: VarAccess::No
            }
        );
        assert!(!fields["hidden"].is_public());
        assert!(fields["plain"].is_public());

        assert!(fields["map"].kind.is_method());
        assert_eq!(fields["map"].params.len(), 1);
        assert_eq!(ctx.type_to_string(&fields["map"].ty), "T -> T");
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn test_default_parameter_on_structure_method_rejected() {
        let mut ctx = context(Vec::new());
        let hint = anon(vec![FieldSyntax::function(
            "map",
            FunctionSyntax::new(Vec::new(), Some(t("Void")))
                .with_params(vec![TypeParamSyntax::new("T").default_type(t("Int"))]),
        )]);
        assert!(ctx.load_complex_type(&hint).is_ok());
        assert!(has_error(&ctx, "Default type parameters are only supported on types (found on T)"));
    }

    #[test]
    fn test_extension_merges_fields() {
        let mut ctx = check(
            vec![typedefs(vec![
                ("Named", anon(vec![var("name", t("String"))])),
                ("Aged", anon(vec![var("age", t("Int"))])),
                ("Person", extend(&["Named", "Aged"], vec![var("email", t("String"))])),
            ])],
            "Shapes",
        );
        assert_no_errors(&ctx);
        assert_eq!(
            resolved(&mut ctx, "Person"),
            "{ name : String, age : Int, email : String }"
        );
    }

    #[test]
    fn test_extension_may_repeat_identical_field() {
        let ctx = check(
            vec![typedefs(vec![
                ("Named", anon(vec![var("name", t("String"))])),
                ("Person", extend(&["Named"], vec![var("name", t("String"))])),
            ])],
            "Shapes",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_extension_field_redefinition() {
        let ctx = check(
            vec![typedefs(vec![
                ("Named", anon(vec![var("name", t("String"))])),
                ("Person", extend(&["Named"], vec![var("name", t("Int"))])),
            ])],
            "Shapes",
        );
        let error = assert_single_error(&ctx, "Cannot redefine field name with different type");
        let related: Vec<&str> = error.related().map(|(message, _)| message).collect();
        assert_eq!(related, vec!["First type was String", "Second type was Int"]);
    }

    #[test]
    fn test_intersection_merges_fields() {
        let mut ctx = check(
            vec![typedefs(vec![
                ("Named", anon(vec![var("name", t("String"))])),
                ("Aged", anon(vec![var("age", t("Int"))])),
                ("Both", TypeHint::Intersection(vec![t("Named"), t("Aged")])),
            ])],
            "Shapes",
        );
        assert_no_errors(&ctx);
        assert_eq!(resolved(&mut ctx, "Both"), "{ name : String, age : Int }");
    }

    #[test]
    fn test_intersection_field_conflict() {
        let ctx = check(
            vec![typedefs(vec![(
                "Both",
                TypeHint::Intersection(vec![anon(vec![var("a", t("Int"))]), anon(vec![var("a", t("String"))])]),
            )])],
            "Shapes",
        );
        let error = assert_single_error(&ctx, "Cannot redefine field a with different type");
        let related: Vec<&str> = error.related().map(|(message, _)| message).collect();
        assert_eq!(related, vec!["First type was Int", "Second type was String"]);

        let mut ctx = check(
            vec![typedefs(vec![(
                "Both",
                TypeHint::Intersection(vec![anon(vec![var("a", t("Int"))]), anon(vec![var("a", t("Int"))])]),
            )])],
            "Shapes",
        );
        assert_no_errors(&ctx);
        assert_eq!(resolved(&mut ctx, "Both"), "{ a : Int }");
    }

    #[test]
    fn test_extend_class_is_rejected() {
        let ctx = check(
            vec![typedefs(vec![("Bad", extend(&["Shapes"], Vec::new()))]).decl(class("Shapes"))],
            "Shapes",
        );
        assert_single_error(&ctx, "Can only extend structures, found Shapes");
    }

    #[test]
    fn test_extend_type_parameter_is_rejected() {
        let mut generic = typedef("Ext", extend(&["T"], vec![var("x", t("Int"))]));
        generic.params.push(TypeParamSyntax::new("T"));
        let ctx = check(vec![ModuleSyntax::new("Shapes").decl(generic)], "Shapes");
        assert_single_error(&ctx, "Cannot structurally extend type parameters");
    }

    #[test]
    fn test_cyclic_extension_is_a_loop() {
        let ctx = check(
            vec![typedefs(vec![
                ("A", extend(&["B"], vec![var("a", t("Int"))])),
                ("B", extend(&["A"], vec![var("b", t("Int"))])),
            ])],
            "Shapes",
        );
        assert_single_error(&ctx, "Loop found in cascading signatures definitions");
        assert_eq!(errors(&ctx).len(), 1);
    }

    #[test]
    fn test_typedef_used_as_field_type() {
        let ctx = check(
            vec![typedefs(vec![("Point", anon(vec![var("x", t("Int"))]))]).decl(
                class("Canvas").field(public_var("origin", t("Point"))),
            )],
            "Shapes",
        );
        assert_no_errors(&ctx);
    }
}
