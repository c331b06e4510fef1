#[cfg(test)]
mod override_validation_tests {
    use crate::syntax::{
        Access, ClassSyntax, Expr, FieldSyntax, FunctionArg, FunctionSyntax, ModuleSyntax, TypeHint,
        TypeParamSyntax,
    };
    use crate::tast::tests::test_helpers::*;
    use crate::tast::symbols::Purity;
    use crate::tast::{FieldFlags, TypeloadContext};

    fn check_main(decls: Vec<ClassSyntax>) -> TypeloadContext {
        let mut module = ModuleSyntax::new("Main");
        for d in decls {
            module = module.decl(d);
        }
        check(vec![module], "Main")
    }

    fn overriding(field: FieldSyntax) -> FieldSyntax {
        field.with_access(&[Access::Override])
    }

    fn animals() -> Vec<ClassSyntax> {
        vec![class("Animal"), class("Dog").extends("Animal")]
    }

    fn with_animals(mut decls: Vec<ClassSyntax>) -> Vec<ClassSyntax> {
        let mut all = animals();
        all.append(&mut decls);
        all
    }

    fn generic_method(name: &str, param: TypeParamSyntax) -> FieldSyntax {
        let p = param.name.clone();
        FieldSyntax::function(
            name,
            FunctionSyntax::new(vec![FunctionArg::new("x", t(&p))], Some(t(&p)))
                .with_params(vec![param])
                .with_body(Expr::block(Vec::new())),
        )
        .with_access(&[Access::Public])
    }

    #[test]
    fn test_missing_override_modifier() {
        let ctx = check_main(vec![
            class("Base").field(method("speak", vec![], t("String"))),
            class("Child").extends("Base").field(method("speak", vec![], t("String"))),
        ]);
        let error = assert_single_error(
            &ctx,
            "Field speak should be declared with 'override' since it is inherited from superclass Base",
        );
        assert_eq!(error.code.as_deref(), Some("E1501"));
        assert_eq!(errors(&ctx).len(), 1);

        let ctx = check_main(vec![
            class("Base").field(method("speak", vec![], t("String"))),
            class("Child").extends("Base").field(overriding(method("speak", vec![], t("String")))),
        ]);
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_override_names_declaring_ancestor() {
        let ctx = check_main(vec![
            class("Root").field(method("speak", vec![], t("Void"))),
            class("Middle").extends("Root"),
            class("Leaf").extends("Middle").field(method("speak", vec![], t("Void"))),
        ]);
        assert_single_error(&ctx, "inherited from superclass Root");
    }

    #[test]
    fn test_override_without_parent_suggests_name() {
        let ctx = check_main(vec![
            class("Base").field(method("speak", vec![], t("String"))),
            class("Child")
                .extends("Base")
                .field(overriding(method("speek", vec![], t("String")))),
        ]);
        assert_single_error(
            &ctx,
            "Field speek is declared 'override' but doesn't override any field (did you mean speak?)",
        );
    }

    #[test]
    fn test_override_without_superclass() {
        let ctx = check_main(vec![class("Lonely").field(overriding(method("run", vec![], t("Void"))))]);
        let error = assert_single_error(&ctx, "Field run is declared 'override' but doesn't override any field");
        assert!(!error.message.contains("did you mean"));
    }

    #[test]
    fn test_valid_override() {
        let ctx = check_main(vec![
            class("Base").field(method("speak", vec![("loud", t("Bool"))], t("String"))),
            class("Child")
                .extends("Base")
                .field(overriding(method("speak", vec![("loud", t("Bool"))], t("String")))),
        ]);
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_covariant_return_type() {
        let ctx = check_main(with_animals(vec![
            class("Shelter").field(method("adopt", vec![], t("Animal"))),
            class("DogShelter")
                .extends("Shelter")
                .field(overriding(method("adopt", vec![], t("Dog")))),
        ]));
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_incompatible_return_type() {
        let ctx = check_main(vec![
            class("Base").field(method("get", vec![], t("Int"))),
            class("Child")
                .extends("Base")
                .field(overriding(method("get", vec![], t("String")))),
        ]);
        let error = assert_single_error(&ctx, "Field get overrides parent class with different or incomplete type");
        assert!(error.notes.iter().any(|n| n == "Cannot unify return types"), "{:?}", error.notes);
        assert!(error.notes.iter().any(|n| n == "String should be Int"), "{:?}", error.notes);
        let related: Vec<&str> = error.related().map(|(m, _)| m).collect();
        assert_eq!(related, vec!["Base field is defined here"]);
    }

    #[test]
    fn test_contravariant_argument() {
        let ctx = check_main(with_animals(vec![
            class("Keeper").field(method("feed", vec![("pet", t("Dog"))], t("Void"))),
            class("AnyKeeper")
                .extends("Keeper")
                .field(overriding(method("feed", vec![("pet", t("Animal"))], t("Void")))),
        ]));
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_covariant_argument_is_rejected() {
        let ctx = check_main(with_animals(vec![
            class("Keeper").field(method("feed", vec![("pet", t("Animal"))], t("Void"))),
            class("DogKeeper")
                .extends("Keeper")
                .field(overriding(method("feed", vec![("pet", t("Dog"))], t("Void")))),
        ]));
        let error = assert_single_error(&ctx, "Field feed overrides parent class");
        assert!(error.notes.iter().any(|n| n == "For function argument 1 of 1"), "{:?}", error.notes);
    }

    #[test]
    fn test_argument_count_mismatch() {
        let ctx = check_main(vec![
            class("Base").field(method("set", vec![("a", t("Int"))], t("Void"))),
            class("Child")
                .extends("Base")
                .field(overriding(method("set", vec![("a", t("Int")), ("b", t("Int"))], t("Void")))),
        ]);
        let error = assert_single_error(&ctx, "Field set overrides parent class");
        assert!(error.notes.iter().any(|n| n == "Different number of function arguments"));
    }

    #[test]
    fn test_optional_argument_mismatch() {
        let optional_arg = FieldSyntax::function(
            "set",
            FunctionSyntax::new(vec![FunctionArg::new("a", t("Int")).optional()], Some(t("Void")))
                .with_body(Expr::block(Vec::new())),
        )
        .with_access(&[Access::Public, Access::Override]);
        let ctx = check_main(vec![
            class("Base").field(method("set", vec![("a", t("Int"))], t("Void"))),
            class("Child").extends("Base").field(optional_arg),
        ]);
        let error = assert_single_error(&ctx, "Field set overrides parent class");
        assert!(error.notes.iter().any(|n| n == "Argument a optionality does not match"));
    }

    #[test]
    fn test_nullable_return_is_not_compatible() {
        let ctx = check_main(vec![
            class("Base").field(method("get", vec![], t("Int"))),
            class("Child")
                .extends("Base")
                .field(overriding(method("get", vec![], TypeHint::Optional(Box::new(t("Int")))))),
        ]);
        assert_single_error(&ctx, "Field get overrides parent class");
    }

    #[test]
    fn test_final_method() {
        let ctx = check_main(vec![
            class("Base").field(method("run", vec![], t("Void")).with_access(&[Access::Final])),
            class("Child").extends("Base").field(overriding(method("run", vec![], t("Void")))),
        ]);
        assert_single_error(&ctx, "Cannot override final method run");
    }

    #[test]
    fn test_inline_method() {
        let ctx = check_main(vec![
            class("Base").field(method("run", vec![], t("Void")).with_access(&[Access::Inline])),
            class("Child").extends("Base").field(overriding(method("run", vec![], t("Void")))),
        ]);
        assert_single_error(&ctx, "Field run is inlined and cannot be overridden");
    }

    #[test]
    fn test_inline_override_of_normal_method() {
        let ctx = check_main(vec![
            class("Base").field(method("run", vec![], t("Void"))),
            class("Child")
                .extends("Base")
                .field(overriding(method("run", vec![], t("Void")).with_access(&[Access::Inline]))),
        ]);
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_less_visible_override() {
        let private_run = FieldSyntax::function(
            "run",
            FunctionSyntax::new(Vec::new(), Some(t("Void"))).with_body(Expr::block(Vec::new())),
        )
        .with_access(&[Access::Override]);
        let ctx = check_main(vec![
            class("Base").field(method("run", vec![], t("Void"))),
            class("Child").extends("Base").field(private_run),
        ]);
        assert_single_error(&ctx, "Field run has less visibility (public/private) than superclass one");
    }

    #[test]
    fn test_method_replaced_by_var() {
        let ctx = check_main(vec![
            class("Base").field(method("run", vec![], t("Void"))),
            class("Child")
                .extends("Base")
                .field(public_var("run", TypeHint::function(vec![], t("Void"))).with_access(&[Access::Override])),
        ]);
        assert!(has_error(&ctx, "Field run has different property access than in superclass"));
    }

    #[test]
    fn test_read_only_property_is_covariant() {
        let read_only = |hint: TypeHint| {
            FieldSyntax::prop("pet", "default", "never", Some(hint)).with_access(&[Access::Public])
        };
        let ctx = check_main(with_animals(vec![
            class("Owner").field(read_only(t("Animal"))),
            class("DogOwner")
                .extends("Owner")
                .field(read_only(t("Dog")).with_access(&[Access::Override])),
        ]));
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_plain_var_is_invariant() {
        let ctx = check_main(with_animals(vec![
            class("Owner").field(public_var("pet", t("Animal"))),
            class("DogOwner")
                .extends("Owner")
                .field(public_var("pet", t("Dog")).with_access(&[Access::Override])),
        ]));
        assert_single_error(&ctx, "Field pet overrides parent class");
    }

    #[test]
    fn test_extern_class_gets_implicit_override() {
        let ctx = check_main(vec![
            class("Base").with_flags(|f| f.extern_ = true).field(method("run", vec![], t("Void"))),
            class("NativeChild")
                .with_flags(|f| f.extern_ = true)
                .extends("Base")
                .field(method("run", vec![], t("Void"))),
        ]);
        assert_no_errors(&ctx);
        let child = decl_named(&ctx, "NativeChild");
        assert!(ctx.class(child).unwrap().fields["run"].has_flag(FieldFlags::OVERRIDE));
    }

    #[test]
    fn test_implementing_abstract_method_needs_no_override() {
        let ctx = check_main(vec![
            class("Shape")
                .with_flags(|f| f.abstract_ = true)
                .field(signature("area", vec![], t("Float")).with_access(&[Access::Public, Access::Abstract])),
            class("Circle").extends("Shape").field(method("area", vec![], t("Float"))),
        ]);
        assert_no_errors(&ctx);
        let circle = decl_named(&ctx, "Circle");
        assert!(ctx.class(circle).unwrap().fields["area"].has_flag(FieldFlags::OVERRIDE));
    }

    #[test]
    fn test_override_on_static_field() {
        let ctx = check_main(vec![class("Util").field(
            method("make", vec![], t("Void")).with_access(&[Access::Static, Access::Override]),
        )]);
        assert_single_error(&ctx, "Invalid override on static field make");
    }

    #[test]
    fn test_overload_matching() {
        let overload = |arg: &str| {
            method("put", vec![("value", t(arg))], t("Void")).with_access(&[Access::Overload])
        };
        let ctx = check_main(vec![
            class("Base").field(overload("Int")).field(overload("String")),
            class("Child").extends("Base").field(overriding(overload("String"))),
        ]);
        assert_no_errors(&ctx);

        let ctx = check_main(vec![
            class("Base").field(overload("Int")).field(overload("String")),
            class("Child").extends("Base").field(overriding(overload("Bool"))),
        ]);
        assert_single_error(&ctx, "Field put is declared 'override' but no compatible overload was found");
    }

    #[test]
    fn test_generic_method_override() {
        let ctx = check_main(vec![
            class("Base").field(generic_method("map", TypeParamSyntax::new("T"))),
            class("Child")
                .extends("Base")
                .field(overriding(generic_method("map", TypeParamSyntax::new("U")))),
        ]);
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_generic_method_constraint_mismatch() {
        let ctx = check_main(with_animals(vec![
            class("Base").field(generic_method("map", TypeParamSyntax::new("T").constraint(t("Animal")))),
            class("Child")
                .extends("Base")
                .field(overriding(generic_method("map", TypeParamSyntax::new("U")))),
        ]));
        let error = assert_single_error(&ctx, "Field map overrides parent class");
        assert!(error.notes.iter().any(|n| n == "Different number of constraints"));

        let ctx = check_main(with_animals(vec![
            class("Base").field(generic_method("map", TypeParamSyntax::new("T").constraint(t("Animal")))),
            class("Child")
                .extends("Base")
                .field(overriding(generic_method("map", TypeParamSyntax::new("U").constraint(t("Dog"))))),
        ]));
        let error = assert_single_error(&ctx, "Field map overrides parent class");
        assert!(error.notes.iter().any(|n| n == "Constraints differ"));
    }

    #[test]
    fn test_pure_parent_expects_pure_child() {
        let ctx = check_main(vec![
            class("Base").field(method("hash", vec![], t("Int")).with_meta(":pure")),
            class("Child").extends("Base").field(overriding(method("hash", vec![], t("Int")))),
        ]);
        assert_no_errors(&ctx);
        let child = decl_named(&ctx, "Child");
        assert_eq!(ctx.class(child).unwrap().fields["hash"].purity(), Purity::ExpectPure);
    }

    #[test]
    fn test_pure_interface_expects_pure_implementation() {
        let ctx = check_main(vec![
            interface("IHash").field(signature("hash", vec![], t("Int")).with_meta(":pure")),
            class("Hashed").implements("IHash").field(method("hash", vec![], t("Int"))),
        ]);
        assert_no_errors(&ctx);
        let hashed = decl_named(&ctx, "Hashed");
        assert_eq!(ctx.class(hashed).unwrap().fields["hash"].purity(), Purity::ExpectPure);
    }

    #[test]
    fn test_pure_interface_reaches_inherited_implementation() {
        let ctx = check_main(vec![
            interface("IHash").field(signature("hash", vec![], t("Int")).with_meta(":pure")),
            class("Base").field(method("hash", vec![], t("Int"))),
            class("Hashed").extends("Base").implements("IHash"),
        ]);
        assert_no_errors(&ctx);
        let base = decl_named(&ctx, "Base");
        assert_eq!(ctx.class(base).unwrap().fields["hash"].purity(), Purity::ExpectPure);
    }
}
