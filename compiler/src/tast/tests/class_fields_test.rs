#[cfg(test)]
mod class_fields_tests {
    use crate::syntax::{
        Access, ClassSyntax, Expr, FieldSyntax, FunctionArg, FunctionSyntax, MetaEntry, ModuleSyntax,
    };
    use crate::tast::tests::test_helpers::*;
    use crate::tast::{FieldFlags, FieldKind, MethodKind, Type, TypeloadContext, VarAccess};

    fn check_main(decl: ClassSyntax) -> TypeloadContext {
        check(vec![ModuleSyntax::new("Main").decl(decl)], "Main")
    }

    #[test]
    fn test_tables_are_split() {
        let ctx = check_main(
            class("Counter")
                .field(public_var("count", t("Int")))
                .field(method("reset", vec![], t("Void")).with_access(&[Access::Static]))
                .field(constructor(Vec::new())),
        );
        assert_no_errors(&ctx);
        let counter = decl_named(&ctx, "Counter");
        let class = ctx.class(counter).unwrap();
        assert_eq!(class.fields.keys().collect::<Vec<_>>(), vec!["count"]);
        assert!(class.statics.contains_key("reset"));
        assert!(class.constructor.is_some());
    }

    #[test]
    fn test_duplicate_field() {
        let ctx = check_main(
            class("Twice")
                .field(public_var("value", t("Int")))
                .field(public_var("value", t("String"))),
        );
        assert_single_error(&ctx, "Duplicate class field declaration : value");

        let ctx = check_main(
            class("Twice")
                .field(method("make", vec![], t("Void")).with_access(&[Access::Static]))
                .field(method("make", vec![], t("Void")).with_access(&[Access::Static])),
        );
        assert_single_error(&ctx, "Duplicate class field declaration : make");
    }

    #[test]
    fn test_duplicate_constructor() {
        let ctx = check_main(class("Twice").field(constructor(Vec::new())).field(constructor(Vec::new())));
        assert_single_error(&ctx, "Duplicate constructor");
    }

    #[test]
    fn test_overloads_share_a_name() {
        let overload = |arg: &str| method("put", vec![("value", t(arg))], t("Void")).with_access(&[Access::Overload]);
        let ctx = check_main(class("Store").field(overload("Int")).field(overload("String")));
        assert_no_errors(&ctx);
        let store = decl_named(&ctx, "Store");
        let put = &ctx.class(store).unwrap().fields["put"];
        assert_eq!(put.overloads.len(), 1);
        assert_eq!(ctx.type_to_string(&put.overloads[0].ty), "String -> Void");
    }

    #[test]
    fn test_field_kinds() {
        let ctx = check_main(
            class("Widget")
                .field(FieldSyntax::prop("size", "get", "null", Some(t("Int"))).with_access(&[Access::Public]))
                .field(method("render", vec![], t("Void")).with_access(&[Access::Inline]))
                .field(method("hook", vec![], t("Void")).with_access(&[Access::Dynamic])),
        );
        assert_no_errors(&ctx);
        let widget = decl_named(&ctx, "Widget");
        let fields = &ctx.class(widget).unwrap().fields;
        assert_eq!(
            fields["size"].kind,
            FieldKind::Var {
                read: VarAccess::Call,
                write: VarAccess::No
            }
        );
        assert_eq!(fields["render"].kind, FieldKind::Method(MethodKind::Inline));
        assert_eq!(fields["hook"].kind, FieldKind::Method(MethodKind::Dynamic));
        assert!(fields["size"].has_flag(FieldFlags::PUBLIC));
    }

    fn flash_only() -> ClassSyntax {
        let mut field = public_var("stage", t("Int"));
        field.meta.push(MetaEntry::new(":require").with_params(vec![Expr::ident("flash")]));
        class("Player").field(field)
    }

    #[test]
    fn test_required_flag_missing() {
        let ctx = check_main(flash_only());
        assert_no_errors(&ctx);
        let player = decl_named(&ctx, "Player");
        assert_eq!(
            ctx.class(player).unwrap().fields["stage"].kind,
            FieldKind::Var {
                read: VarAccess::Require,
                write: VarAccess::Normal
            }
        );
    }

    #[test]
    fn test_required_flag_defined() {
        let mut ctx = context(vec![ModuleSyntax::new("Main").decl(flash_only())]);
        ctx.config.defines.push("flash".to_string());
        ctx.check_module("Main").unwrap();
        assert_no_errors(&ctx);
        let player = decl_named(&ctx, "Player");
        assert_eq!(ctx.class(player).unwrap().fields["stage"].kind, FieldKind::PLAIN_VAR);
    }

    #[test]
    fn test_untyped_fields() {
        let ctx = check_main(
            class("Guess")
                .field(FieldSyntax::var("count", None).with_expr(Expr::int(3)))
                .field(FieldSyntax::var("later", None)),
        );
        assert_no_errors(&ctx);
        let guess = decl_named(&ctx, "Guess");
        let fields = &ctx.class(guess).unwrap().fields;
        assert_eq!(ctx.type_to_string(&fields["count"].ty), "Int");
        assert!(matches!(fields["later"].ty, Type::Mono(_)));
    }

    #[test]
    fn test_optional_and_default_arguments() {
        let function = FunctionSyntax::new(
            vec![
                FunctionArg::new("a", t("Int")),
                FunctionArg::new("b", t("Int")).optional(),
            ],
            Some(t("Int")),
        )
        .with_body(Expr::block(Vec::new()));
        let ctx = check_main(class("Math").field(FieldSyntax::function("add", function).with_access(&[Access::Public])));
        assert_no_errors(&ctx);
        let math = decl_named(&ctx, "Math");
        let add = &ctx.class(math).unwrap().fields["add"];
        match &add.ty {
            Type::Function { args, .. } => {
                assert!(!args[0].optional);
                assert!(args[1].optional);
            }
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_field_keeps_the_rest() {
        let ctx = check_main(
            class("Partial")
                .field(public_var("broken", t("Missing")))
                .field(public_var("fine", t("Int"))),
        );
        assert_single_error(&ctx, "Type not found : Missing");
        let partial = decl_named(&ctx, "Partial");
        assert!(ctx.class(partial).unwrap().fields.contains_key("fine"));
    }
}
