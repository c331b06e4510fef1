//! Benchmarks for type loading on generated hierarchies

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use typeload::syntax::{
    Access, ClassSyntax, ClassSyntaxFlags, Expr, FieldSyntax, FunctionArg, FunctionSyntax, HeritageClause,
    ImportSyntax, ModuleSyntax, TypeHint, TypeParamSyntax, TypePathHint,
};
use typeload::tast::MemoryLoader;
use typeload::{TypeloadConfig, TypeloadContext};

fn class(name: &str) -> ClassSyntax {
    ClassSyntax {
        name: name.to_string(),
        span: Default::default(),
        flags: ClassSyntaxFlags::default(),
        params: Vec::new(),
        heritage: Vec::new(),
        fields: Vec::new(),
        meta: Vec::new(),
    }
}

fn method(name: &str, args: Vec<(&str, TypeHint)>, ret: TypeHint, access: &[Access]) -> FieldSyntax {
    let args = args.into_iter().map(|(n, t)| FunctionArg::new(n, t)).collect();
    FieldSyntax::function(
        name,
        FunctionSyntax::new(args, Some(ret)).with_body(Expr::block(Vec::new())),
    )
    .with_access(access)
}

fn check(modules: Vec<ModuleSyntax>, entry: &str) -> TypeloadContext {
    let mut loader = MemoryLoader::new();
    for module in modules {
        loader.add(module);
    }
    let mut ctx = TypeloadContext::with_loader(TypeloadConfig::default(), Box::new(loader));
    if let Err(err) = ctx.check_module(entry) {
        ctx.report(err);
    }
    ctx
}

/// `Level0 <- Level1 <- ...`, each level overriding every inherited method
fn deep_inheritance(depth: usize) -> Vec<ModuleSyntax> {
    let mut module = ModuleSyntax::new("Main");
    for i in 0..depth {
        let mut c = class(&format!("Level{}", i));
        if i > 0 {
            c.heritage
                .push(HeritageClause::Extends(TypePathHint::new(&format!("Level{}", i - 1))));
        }
        for m in 0..=i {
            let access: &[Access] = if m < i {
                &[Access::Public, Access::Override]
            } else {
                &[Access::Public]
            };
            c.fields.push(method(&format!("method{}", m), vec![], TypeHint::path("Int"), access));
        }
        module = module.decl(c);
    }
    vec![module]
}

/// Many modules in one package, each importing the previous one
fn many_modules(count: usize) -> (Vec<ModuleSyntax>, String) {
    let mut modules = Vec::with_capacity(count);
    for i in 0..count {
        let mut module = ModuleSyntax::new(&format!("pkg.M{}", i));
        let mut c = class(&format!("M{}", i));
        if i > 0 {
            module = module.import(ImportSyntax::path(&format!("pkg.M{}", i - 1)));
            c.fields.push(
                FieldSyntax::var("prev", Some(TypeHint::path(&format!("M{}", i - 1)))).with_access(&[Access::Public]),
            );
        }
        modules.push(module.decl(c));
    }
    (modules, format!("pkg.M{}", count - 1))
}

/// A generic container used with many argument types
fn generic_heavy(fields: usize) -> Vec<ModuleSyntax> {
    let mut container = class("Container");
    container.params.push(TypeParamSyntax::new("T"));
    container.fields.push(method("get", vec![], TypeHint::path("T"), &[Access::Public]));
    container
        .fields
        .push(method("set", vec![("value", TypeHint::path("T"))], TypeHint::path("Void"), &[Access::Public]));

    let mut user = class("User");
    for i in 0..fields {
        let arg = match i % 4 {
            0 => TypeHint::path("Int"),
            1 => TypeHint::path("String"),
            2 => TypeHint::generic("Array", vec![TypeHint::path("Float")]),
            _ => TypeHint::generic("Container", vec![TypeHint::path("Bool")]),
        };
        user.fields.push(
            FieldSyntax::var(&format!("c{}", i), Some(TypeHint::generic("Container", vec![arg])))
                .with_access(&[Access::Public]),
        );
    }
    vec![ModuleSyntax::new("Main").decl(container).decl(user)]
}

/// Classes implementing a wide interface
fn wide_interfaces(width: usize) -> Vec<ModuleSyntax> {
    let mut intf = class("IWide");
    intf.flags.interface = true;
    let mut imp = class("Wide");
    imp.heritage.push(HeritageClause::Implements(TypePathHint::new("IWide")));
    for i in 0..width {
        let name = format!("op{}", i);
        intf.fields.push(FieldSyntax::function(
            &name,
            FunctionSyntax::new(vec![FunctionArg::new("x", TypeHint::path("Int"))], Some(TypeHint::path("Int"))),
        ));
        imp.fields.push(method(&name, vec![("x", TypeHint::path("Int"))], TypeHint::path("Int"), &[Access::Public]));
    }
    vec![ModuleSyntax::new("Main").decl(intf).decl(imp)]
}

fn benchmark_inheritance(c: &mut Criterion) {
    let mut group = c.benchmark_group("inheritance_override_checks");
    for depth in [10, 20, 50].iter() {
        let modules = deep_inheritance(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &modules, |b, modules| {
            b.iter(|| {
                let ctx = check(black_box(modules.clone()), "Main");
                black_box(ctx.diagnostics.len());
            });
        });
    }
    group.finish();
}

fn benchmark_module_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("module_resolution");
    for count in [10, 100, 500].iter() {
        let (modules, entry) = many_modules(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &modules, |b, modules| {
            b.iter(|| {
                let ctx = check(black_box(modules.clone()), &entry);
                black_box(ctx.decls.len());
            });
        });
    }
    group.finish();
}

fn benchmark_generic_instantiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generic_instantiation");
    for fields in [50, 200, 1000].iter() {
        let modules = generic_heavy(*fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &modules, |b, modules| {
            b.iter(|| {
                let ctx = check(black_box(modules.clone()), "Main");
                black_box(ctx.diagnostics.len());
            });
        });
    }
    group.finish();
}

fn benchmark_interface_conformance(c: &mut Criterion) {
    let mut group = c.benchmark_group("interface_conformance");
    for width in [10, 100, 500].iter() {
        let modules = wide_interfaces(*width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &modules, |b, modules| {
            b.iter(|| {
                let ctx = check(black_box(modules.clone()), "Main");
                black_box(ctx.diagnostics.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_inheritance,
    benchmark_module_resolution,
    benchmark_generic_instantiation,
    benchmark_interface_conformance
);
criterion_main!(benches);
