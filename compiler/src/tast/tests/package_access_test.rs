#[cfg(test)]
mod package_access_tests {
    use crate::syntax::{ImportSyntax, ModuleSyntax, TypeHint};
    use crate::tast::tests::test_helpers::*;
    use crate::tast::Type;

    fn lib_util() -> ModuleSyntax {
        ModuleSyntax::new("lib.Util")
            .decl(class("Util"))
            .decl(class("Secret").with_flags(|f| f.private = true))
            .decl(class("Other"))
    }

    #[test]
    fn test_same_package_lookup() {
        let ctx = check(
            vec![
                ModuleSyntax::new("app.Main").decl(class("Main").field(public_var("h", t("Helper")))),
                ModuleSyntax::new("app.Helper").decl(class("Helper")),
            ],
            "app.Main",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_parent_package_lookup() {
        let ctx = check(
            vec![
                ModuleSyntax::new("app.ui.Main").decl(class("Main").field(public_var("h", t("Helper")))),
                ModuleSyntax::new("app.Helper").decl(class("Helper")),
            ],
            "app.ui.Main",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_type_not_found() {
        let ctx = check(
            vec![ModuleSyntax::new("Main").decl(class("Main").field(public_var("x", t("Missing"))))],
            "Main",
        );
        assert_single_error(&ctx, "Type not found : Missing");
    }

    #[test]
    fn test_module_not_found_for_qualified_path() {
        let ctx = check(
            vec![ModuleSyntax::new("Main").decl(class("Main").field(public_var("x", t("nowhere.Thing"))))],
            "Main",
        );
        assert_single_error(&ctx, "Module not found : nowhere.Thing");
    }

    #[test]
    fn test_sub_type_lookup() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main").decl(class("Main").field(public_var("o", t("lib.Util.Other")))),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_module_does_not_define_type() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main").decl(class("Main").field(public_var("o", t("lib.Util.Nope")))),
            ],
            "Main",
        );
        assert_single_error(&ctx, "Module lib.Util does not define type Nope");
    }

    #[test]
    fn test_private_type_is_hidden() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main").decl(class("Main").field(public_var("s", t("lib.Util.Secret")))),
            ],
            "Main",
        );
        assert_single_error(&ctx, "Cannot access private type Secret in module lib.Util");
    }

    #[test]
    fn test_private_type_visible_in_own_module() {
        let ctx = check(
            vec![ModuleSyntax::new("lib.Util")
                .decl(class("Util").field(public_var("s", t("Secret"))))
                .decl(class("Secret").with_flags(|f| f.private = true))],
            "lib.Util",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_import_whole_module() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main")
                    .import(ImportSyntax::path("lib.Util"))
                    .decl(class("Main").field(public_var("o", t("Other")))),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
        assert_eq!(ctx.diagnostics.warnings().count(), 0);
    }

    #[test]
    fn test_import_skips_private_types() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main")
                    .import(ImportSyntax::path("lib.Util"))
                    .decl(class("Main").field(public_var("s", t("Secret")))),
            ],
            "Main",
        );
        assert_single_error(&ctx, "Type not found : Secret");
    }

    #[test]
    fn test_import_alias() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main")
                    .import(ImportSyntax::path("lib.Util").alias("U"))
                    .decl(class("Main").field(public_var("u", t("U")))),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_wildcard_import() {
        let ctx = check(
            vec![
                ModuleSyntax::new("lib.Tool").decl(class("Tool")),
                ModuleSyntax::new("Main")
                    .import(ImportSyntax::wildcard("lib"))
                    .decl(class("Main").field(public_var("t", t("Tool")))),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_local_type_wins_over_wildcard() {
        let ctx = check(
            vec![
                ModuleSyntax::new("lib.Tool").decl(class("Tool")),
                ModuleSyntax::new("Main")
                    .import(ImportSyntax::wildcard("lib"))
                    .decl(class("Tool"))
                    .decl(class("Main").field(public_var("t", t("Tool")))),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
        let main = decl_named(&ctx, "Main");
        let Type::Instance { decl, .. } = &ctx.class(main).unwrap().fields["t"].ty else {
            panic!("expected a class instance");
        };
        assert!(ctx.decl(*decl).path.pack.is_empty());
    }

    #[test]
    fn test_failed_import_is_reported() {
        let ctx = check(
            vec![ModuleSyntax::new("Main")
                .import(ImportSyntax::path("lib.Gone"))
                .decl(class("Main"))],
            "Main",
        );
        assert_single_error(&ctx, "Module not found : lib.Gone");
    }

    #[test]
    fn test_unused_import_warning() {
        let ctx = check(
            vec![
                lib_util(),
                ModuleSyntax::new("Main")
                    .import(ImportSyntax::path("lib.Util"))
                    .decl(class("Main")),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
        let warnings: Vec<String> = ctx.diagnostics.warnings().map(|w| w.message.clone()).collect();
        assert_eq!(warnings, vec!["Unused import lib.Util".to_string()]);
    }

    #[test]
    fn test_std_root_is_dropped_when_missing() {
        let ctx = check(
            vec![
                ModuleSyntax::new("util.Helper").decl(class("Helper")),
                ModuleSyntax::new("Main").decl(class("Main").field(public_var("h", t("std.util.Helper")))),
            ],
            "Main",
        );
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_duplicate_type_in_module() {
        let ctx = check(
            vec![ModuleSyntax::new("Main").decl(class("Main")).decl(class("Main"))],
            "Main",
        );
        assert_single_error(&ctx, "Name Main is already defined in this module");
    }

    #[test]
    fn test_builtin_types_resolve_everywhere() {
        let ctx = check(
            vec![ModuleSyntax::new("deep.pack.Main").decl(
                class("Main")
                    .field(public_var("i", t("Int")))
                    .field(public_var("s", t("String")))
                    .field(public_var("a", TypeHint::generic("Array", vec![t("Float")]))),
            )],
            "deep.pack.Main",
        );
        assert_no_errors(&ctx);
    }
}
