//! Integration tests for the class hierarchy and override resolution.

use treeshake::hierarchy::ClassHierarchy;
use treeshake::program::{GenericParam, MethodSpec, ParamType, ProgramBuilder, TypeId};
use treeshake::OverrideResolver;

fn directly_subclasses(hierarchy: &ClassHierarchy, sub: TypeId, sup: TypeId) -> bool {
    hierarchy.direct_subclasses(sup).any(|t| t == sub)
}

#[test]
fn test_direct_subclasses_including_interfaces() {
    let mut builder = ProgramBuilder::new();
    let module = builder.add_module("app");

    let sup = builder.add_class(module, "App.SuperClass");
    let has_m = builder.add_interface(module, "App.HasM");
    let has_m_and_f = builder.add_interface(module, "App.HasMAndF");
    builder.add_interface_impl(has_m_and_f, has_m);

    let sub1 = builder.add_class(module, "App.SubClass1");
    builder.set_base(sub1, sup);
    builder.add_interface_impl(sub1, has_m);
    let sub2 = builder.add_class(module, "App.SubClass2");
    builder.set_base(sub2, sup);
    let subsub1 = builder.add_class(module, "App.SubSubClass1");
    builder.set_base(subsub1, sub1);
    let unrelated = builder.add_class(module, "App.Unrelated");
    let foo_with_m = builder.add_class(module, "App.FooWithM");
    builder.add_interface_impl(foo_with_m, has_m);

    let program = builder.finish().expect("program");
    let hierarchy = ClassHierarchy::new(&program);

    assert!(directly_subclasses(&hierarchy, sub1, sup));
    assert!(directly_subclasses(&hierarchy, sub2, sup));
    assert!(!directly_subclasses(&hierarchy, sup, sub1));

    assert!(directly_subclasses(&hierarchy, subsub1, sub1));
    assert!(!directly_subclasses(&hierarchy, subsub1, sup));

    assert!(!directly_subclasses(&hierarchy, unrelated, sup));
    assert!(!directly_subclasses(&hierarchy, sup, unrelated));

    // A type is never a subclass of itself.
    assert!(!directly_subclasses(&hierarchy, sup, sup));

    // Interfaces participate in the same DAG.
    assert!(directly_subclasses(&hierarchy, sub1, has_m));
    assert!(directly_subclasses(&hierarchy, foo_with_m, has_m));
    assert!(directly_subclasses(&hierarchy, has_m_and_f, has_m));

    assert!(!directly_subclasses(&hierarchy, subsub1, has_m));
    assert!(!directly_subclasses(&hierarchy, unrelated, has_m));
}

#[test]
fn test_interfaces_are_subtypes_of_the_platform_root() {
    let mut builder = ProgramBuilder::new();
    let core = builder.add_core_module("platform");
    let object_root = builder.add_class(core, "System.Object");
    builder.set_object_root(core, object_root);
    let string_ty = builder.add_class(core, "System.String");
    builder.set_base(string_ty, object_root);

    let module = builder.add_module("app");
    let foo = builder.add_class(module, "App.Foo");
    builder.set_base(foo, object_root);
    let has_m = builder.add_interface(module, "App.HasM");

    let program = builder.finish().expect("program");
    let hierarchy = ClassHierarchy::new(&program);

    assert!(directly_subclasses(&hierarchy, foo, object_root));
    assert!(directly_subclasses(&hierarchy, string_ty, object_root));
    assert!(directly_subclasses(&hierarchy, has_m, object_root));
}

#[test]
fn test_generic_edges_at_unbound_identity() {
    // Both the generic subclass and a closed specialization relate to the
    // single unbound superclass definition.
    let mut builder = ProgramBuilder::new();
    let module = builder.add_module("app");

    let has_m = builder.add_interface(module, "App.HasM");
    builder.add_type_param(has_m, GenericParam::new("T"));

    let generic_sup = builder.add_class(module, "App.GenericSuperClass");
    builder.add_type_param(generic_sup, GenericParam::new("T"));

    let generic_sub = builder.add_class(module, "App.GenericSubClass");
    builder.add_type_param(generic_sub, GenericParam::new("T"));
    builder.set_base(generic_sub, generic_sup);

    let specialized_sub = builder.add_class(module, "App.SpecializedSubClass");
    builder.set_base(specialized_sub, generic_sup);

    let foo_generic = builder.add_class(module, "App.FooHasMGeneric");
    builder.add_type_param(foo_generic, GenericParam::new("T"));
    builder.add_interface_impl(foo_generic, has_m);

    let foo_specialized = builder.add_class(module, "App.FooHasMSpecialized");
    builder.add_interface_impl(foo_specialized, has_m);

    let program = builder.finish().expect("program");
    let hierarchy = ClassHierarchy::new(&program);

    assert!(directly_subclasses(&hierarchy, generic_sub, generic_sup));
    assert!(directly_subclasses(&hierarchy, specialized_sub, generic_sup));
    assert!(directly_subclasses(&hierarchy, foo_generic, has_m));
    assert!(directly_subclasses(&hierarchy, foo_specialized, has_m));
}

#[test]
fn test_all_subclasses_excludes_the_type_itself() {
    let mut builder = ProgramBuilder::new();
    let module = builder.add_module("app");
    let sup = builder.add_class(module, "App.SuperClass");
    let sub = builder.add_class(module, "App.SubClass");
    let subsub = builder.add_class(module, "App.SubSubClass");
    builder.set_base(sub, sup);
    builder.set_base(subsub, sub);
    let program = builder.finish().expect("program");

    let hierarchy = ClassHierarchy::new(&program);
    let all = hierarchy.all_subclasses(sup);
    assert_eq!(all.len(), 2);
    assert!(all.contains(&sub));
    assert!(all.contains(&subsub));
    assert!(!all.contains(&sup));
}

#[test]
fn test_explicit_implementation_precedence() {
    // Explicit implementations supersede implicit ones, including an
    // explicit implementation on a base class below a more derived
    // implicit override.
    let mut builder = ProgramBuilder::new();
    let module = builder.add_module("app");

    let has_m1 = builder.add_interface(module, "App.HasM1");
    let has_m1_m = builder.add_method(has_m1, MethodSpec::abstract_method("M"));
    let has_m2 = builder.add_interface(module, "App.HasM2");
    let has_m2_m = builder.add_method(has_m2, MethodSpec::abstract_method("M"));

    let sup = builder.add_class(module, "App.SuperClass");
    builder.add_interface_impl(sup, has_m1);
    let sup_m = builder.add_method(sup, MethodSpec::virtual_method("M"));

    let sub = builder.add_class(module, "App.SubClass");
    builder.set_base(sub, sup);

    let subsub = builder.add_class(module, "App.SubSubClass");
    builder.set_base(subsub, sub);
    builder.add_interface_impl(subsub, has_m2);
    let subsub_m = builder.add_method(subsub, MethodSpec::virtual_method("M"));
    let subsub_explicit_m2 = builder.add_method(
        subsub,
        MethodSpec::virtual_method("HasM2.M").explicit_impl_of(has_m2_m),
    );

    let subsubsub = builder.add_class(module, "App.SubSubSubClass");
    builder.set_base(subsubsub, subsub);
    builder.add_interface_impl(subsubsub, has_m1);
    let subsubsub_explicit_m1 = builder.add_method(
        subsubsub,
        MethodSpec::virtual_method("HasM1.M").explicit_impl_of(has_m1_m),
    );

    let subsubsubsub = builder.add_class(module, "App.SubSubSubSubClass");
    builder.set_base(subsubsubsub, subsubsub);

    let program = builder.finish().expect("program");
    let resolver = OverrideResolver::new(&program);

    assert_eq!(resolver.implements(sup, sup, has_m1_m), vec![sup_m]);

    assert_eq!(resolver.implements(subsub, sup, has_m1_m), vec![subsub_m]);
    assert_eq!(
        resolver.implements(subsub, sup, has_m2_m),
        vec![subsub_explicit_m2]
    );

    assert_eq!(
        resolver.implements(subsubsub, sup, has_m1_m),
        vec![subsubsub_explicit_m1]
    );
    assert_eq!(
        resolver.implements(subsubsub, sup, has_m2_m),
        vec![subsub_explicit_m2]
    );

    assert_eq!(
        resolver.implements(subsubsubsub, sup, has_m1_m),
        vec![subsubsub_explicit_m1]
    );
    assert_eq!(
        resolver.implements(subsubsubsub, sup, has_m2_m),
        vec![subsub_explicit_m2]
    );

    // Ordinary override resolution against class-declared methods.
    assert_eq!(resolver.implements(subsubsubsub, sup, sup_m), vec![subsub_m]);
    assert_eq!(
        resolver.implements(subsubsubsub, sup, subsub_m),
        vec![subsub_m]
    );
}

#[test]
fn test_generic_explicit_implementation_found_from_specialized_subclass() {
    let mut builder = ProgramBuilder::new();
    let module = builder.add_module("app");

    let ihasm = builder.add_interface(module, "App.IHasM");
    builder.add_type_param(ihasm, GenericParam::new("T"));
    let declared = builder.add_method(
        ihasm,
        MethodSpec::abstract_method("M")
            .params(vec![ParamType::TypeParam(0)])
            .returns(ParamType::TypeParam(0)),
    );

    let generic_sup = builder.add_class(module, "App.GenericSuperClass");
    builder.add_type_param(generic_sup, GenericParam::new("T"));
    builder.add_interface_impl(generic_sup, ihasm);
    let explicit_m = builder.add_method(
        generic_sup,
        MethodSpec::virtual_method("IHasM.M")
            .params(vec![ParamType::TypeParam(0)])
            .returns(ParamType::TypeParam(0))
            .explicit_impl_of(declared),
    );

    let specialized = builder.add_class(module, "App.SpecializedSubClass");
    builder.set_base(specialized, generic_sup);

    let program = builder.finish().expect("program");
    let resolver = OverrideResolver::new(&program);

    assert_eq!(
        resolver.implements(generic_sup, generic_sup, declared),
        vec![explicit_m]
    );
    assert_eq!(
        resolver.implements(specialized, generic_sup, declared),
        vec![explicit_m]
    );
}

#[test]
fn test_erasure_multiplicity_is_a_set_result() {
    let mut builder = ProgramBuilder::new();
    let core = builder.add_core_module("platform");
    let string_ty = builder.add_class(core, "System.String");
    let int_ty = builder.add_struct(core, "System.Int32");

    let module = builder.add_module("app");
    let ihasm = builder.add_interface(module, "App.IHasM");
    builder.add_type_param(ihasm, GenericParam::new("T"));
    let declared = builder.add_method(
        ihasm,
        MethodSpec::abstract_method("M").params(vec![ParamType::TypeParam(0)]),
    );

    let class = builder.add_class(module, "App.FooWithM");
    builder.add_interface_impl(class, ihasm);
    let m_string = builder.add_method(
        class,
        MethodSpec::virtual_method("M").params(vec![ParamType::Concrete(string_ty)]),
    );
    let m_int = builder.add_method(
        class,
        MethodSpec::virtual_method("M").params(vec![ParamType::Concrete(int_ty)]),
    );

    let program = builder.finish().expect("program");
    let resolver = OverrideResolver::new(&program);

    let found: std::collections::HashSet<_> =
        resolver.implements(class, ihasm, declared).into_iter().collect();
    let expected: std::collections::HashSet<_> = [m_string, m_int].into_iter().collect();
    assert_eq!(found, expected);
}
