//! Type representation for the tailor target language.
//!
//! Defines the core `Ty` enum covering the Java-style type vocabulary the
//! rewriting engine matches over: primitives, class types with invariant
//! type arguments, arrays, named type variables, wildcards, the null
//! (bottom) type, and method types. `Ty::Error` stands for "unknown" and
//! unifies with nothing.

use std::fmt;

use serde::Serialize;

/// A primitive type of the target language.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Prim {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl Prim {
    /// Position in the numeric widening chain, or `None` for
    /// non-numeric primitives.
    pub fn widening_rank(self) -> Option<u8> {
        match self {
            Prim::Byte => Some(0),
            Prim::Short => Some(1),
            Prim::Char => Some(1),
            Prim::Int => Some(2),
            Prim::Long => Some(3),
            Prim::Float => Some(4),
            Prim::Double => Some(5),
            Prim::Boolean | Prim::Void => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.widening_rank().is_some()
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Prim::Boolean => "boolean",
            Prim::Char => "char",
            Prim::Byte => "byte",
            Prim::Short => "short",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
            Prim::Void => "void",
        };
        write!(f, "{name}")
    }
}

/// The direction of a wildcard bound: `? extends T` or `? super T`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BoundKind {
    Extends,
    Super,
}

/// A class type: fully qualified name plus type arguments.
///
/// Type arguments are invariant; `List<Integer>` is not a subtype of
/// `List<Number>`. Wildcard containment is handled in `Types::is_subtype`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ClassTy {
    pub name: String,
    pub args: Vec<Ty>,
}

/// A method type: parameter types and a return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MethodTy {
    pub params: Vec<Ty>,
    pub ret: Box<Ty>,
}

/// A target-language type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Ty {
    /// A primitive type.
    Prim(Prim),
    /// A class type, possibly with type arguments.
    Class(ClassTy),
    /// An array type.
    Array(Box<Ty>),
    /// A named type variable (a template type variable during matching).
    Var(String),
    /// A wildcard type argument: `? extends T` or `? super T`.
    Wildcard(BoundKind, Box<Ty>),
    /// The null/bottom type, a subtype of every reference type.
    Null,
    /// A method type.
    Method(MethodTy),
    /// An unknown or erroneous type. Matches nothing.
    Error,
}

impl Ty {
    pub fn boolean() -> Ty {
        Ty::Prim(Prim::Boolean)
    }

    pub fn int() -> Ty {
        Ty::Prim(Prim::Int)
    }

    pub fn long() -> Ty {
        Ty::Prim(Prim::Long)
    }

    pub fn double() -> Ty {
        Ty::Prim(Prim::Double)
    }

    pub fn char_() -> Ty {
        Ty::Prim(Prim::Char)
    }

    pub fn byte() -> Ty {
        Ty::Prim(Prim::Byte)
    }

    pub fn void() -> Ty {
        Ty::Prim(Prim::Void)
    }

    /// A class type with no type arguments.
    pub fn class(name: impl Into<String>) -> Ty {
        Ty::Class(ClassTy { name: name.into(), args: Vec::new() })
    }

    /// A class type with type arguments.
    pub fn generic(name: impl Into<String>, args: Vec<Ty>) -> Ty {
        Ty::Class(ClassTy { name: name.into(), args })
    }

    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    pub fn var(name: impl Into<String>) -> Ty {
        Ty::Var(name.into())
    }

    pub fn wildcard(kind: BoundKind, bound: Ty) -> Ty {
        Ty::Wildcard(kind, Box::new(bound))
    }

    pub fn method(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Method(MethodTy { params, ret: Box::new(ret) })
    }

    pub fn string() -> Ty {
        Ty::class("java.lang.String")
    }

    pub fn object() -> Ty {
        Ty::class("java.lang.Object")
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Prim(Prim::Void))
    }

    /// Whether this is a reference type (class, array, variable, or null).
    pub fn is_reference(&self) -> bool {
        matches!(self, Ty::Class(_) | Ty::Array(_) | Ty::Var(_) | Ty::Null)
    }

    /// The class name if this is a class type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Ty::Class(c) => Some(&c.name),
            _ => None,
        }
    }

    /// The boxed counterpart of a primitive type; any other type is
    /// returned unchanged.
    pub fn boxed(&self) -> Ty {
        match self {
            Ty::Prim(Prim::Boolean) => Ty::class("java.lang.Boolean"),
            Ty::Prim(Prim::Char) => Ty::class("java.lang.Character"),
            Ty::Prim(Prim::Byte) => Ty::class("java.lang.Byte"),
            Ty::Prim(Prim::Short) => Ty::class("java.lang.Short"),
            Ty::Prim(Prim::Int) => Ty::class("java.lang.Integer"),
            Ty::Prim(Prim::Long) => Ty::class("java.lang.Long"),
            Ty::Prim(Prim::Float) => Ty::class("java.lang.Float"),
            Ty::Prim(Prim::Double) => Ty::class("java.lang.Double"),
            _ => self.clone(),
        }
    }

    /// Substitute named type variables using `lookup`.
    ///
    /// Variables for which `lookup` returns `None` are left in place.
    pub fn subst(&self, lookup: &dyn Fn(&str) -> Option<Ty>) -> Ty {
        match self {
            Ty::Var(name) => lookup(name).unwrap_or_else(|| self.clone()),
            Ty::Class(c) => Ty::Class(ClassTy {
                name: c.name.clone(),
                args: c.args.iter().map(|a| a.subst(lookup)).collect(),
            }),
            Ty::Array(elem) => Ty::Array(Box::new(elem.subst(lookup))),
            Ty::Wildcard(kind, bound) => Ty::Wildcard(*kind, Box::new(bound.subst(lookup))),
            Ty::Method(m) => Ty::Method(MethodTy {
                params: m.params.iter().map(|p| p.subst(lookup)).collect(),
                ret: Box::new(m.ret.subst(lookup)),
            }),
            Ty::Prim(_) | Ty::Null | Ty::Error => self.clone(),
        }
    }

    /// All named type variables mentioned in this type, in first-use order.
    pub fn free_vars(&self, out: &mut Vec<String>) {
        match self {
            Ty::Var(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Ty::Class(c) => {
                for a in &c.args {
                    a.free_vars(out);
                }
            }
            Ty::Array(elem) => elem.free_vars(out),
            Ty::Wildcard(_, bound) => bound.free_vars(out),
            Ty::Method(m) => {
                for p in &m.params {
                    p.free_vars(out);
                }
                m.ret.free_vars(out);
            }
            Ty::Prim(_) | Ty::Null | Ty::Error => {}
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(p) => write!(f, "{p}"),
            Ty::Class(c) => {
                write!(f, "{}", c.name)?;
                if !c.args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in c.args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Array(elem) => write!(f, "{elem}[]"),
            Ty::Var(name) => write!(f, "{name}"),
            Ty::Wildcard(BoundKind::Extends, bound) => write!(f, "? extends {bound}"),
            Ty::Wildcard(BoundKind::Super, bound) => write!(f, "? super {bound}"),
            Ty::Null => write!(f, "<null>"),
            Ty::Method(m) => {
                write!(f, "(")?;
                for (i, p) in m.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {}", m.ret)
            }
            Ty::Error => write!(f, "<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(Ty::int().to_string(), "int");
        assert_eq!(Ty::array(Ty::byte()).to_string(), "byte[]");
        assert_eq!(
            Ty::generic("java.util.List", vec![Ty::string()]).to_string(),
            "java.util.List<java.lang.String>"
        );
        assert_eq!(
            Ty::generic(
                "java.util.Comparator",
                vec![Ty::wildcard(BoundKind::Super, Ty::var("E"))]
            )
            .to_string(),
            "java.util.Comparator<? super E>"
        );
        assert_eq!(
            Ty::method(vec![Ty::int(), Ty::int()], Ty::long()).to_string(),
            "(int, int) -> long"
        );
    }

    #[test]
    fn subst_replaces_nested_vars() {
        let ty = Ty::generic("java.util.List", vec![Ty::var("E")]);
        let out = ty.subst(&|name| (name == "E").then(Ty::string));
        assert_eq!(out, Ty::generic("java.util.List", vec![Ty::string()]));
    }

    #[test]
    fn free_vars_in_first_use_order() {
        let ty = Ty::method(vec![Ty::var("T"), Ty::var("E")], Ty::var("T"));
        let mut vars = Vec::new();
        ty.free_vars(&mut vars);
        assert_eq!(vars, vec!["T".to_owned(), "E".to_owned()]);
    }
}
