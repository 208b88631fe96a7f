//! Constructor selection
//!
//! Picks the public constructor of a type that a list of arguments should
//! be passed to.
//!
//! The explicit strategy takes the runtime type of every argument and
//! requires a constructor declaring exactly that parameter list. The
//! heuristic strategy pairs parameters with arguments by compatibility:
//! first positionally, then (if no candidate pairs positionally) in any
//! order, so `("x", 5)` can reach a `(int, String)` constructor. The
//! chosen pairing is returned as an argument order for the call.

use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::{ReflectError, ReflectResult};
use crate::handle::ConstructorHandle;
use crate::lookup::MemberLookup;
use crate::registry::TypeRegistry;
use crate::value::Value;

use std::sync::Arc;

/// How to choose among constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Heuristic if any argument is a proxy, otherwise explicit with a
    /// heuristic fallback
    #[default]
    Auto,
    /// Exact match on the arguments' runtime types
    Explicit,
    /// Compatibility pairing in any order
    Heuristic,
}

/// A chosen constructor and how to arrange the arguments for it
#[derive(Debug, Clone)]
pub struct Selection {
    constructor: ConstructorHandle,
    order: Vec<usize>,
}

impl Selection {
    /// The chosen constructor
    pub fn constructor(&self) -> &ConstructorHandle {
        &self.constructor
    }

    /// For each declared parameter, the index of the argument bound to it
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Arguments rearranged into declared parameter order
    pub fn arrange(&self, args: &[Value]) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|&index| args.get(index).cloned())
            .collect()
    }
}

/// Constructor selector over a registry
#[derive(Clone, Copy)]
pub struct ConstructorSelector<'a> {
    registry: &'a TypeRegistry,
    lookup: MemberLookup<'a>,
}

impl<'a> ConstructorSelector<'a> {
    /// Create a selector
    pub fn new(registry: &'a TypeRegistry, lookup: MemberLookup<'a>) -> Self {
        Self { registry, lookup }
    }

    /// Select a public constructor of `ty` for the arguments
    pub fn select(
        &self,
        ty: &Arc<TypeDescriptor>,
        args: &[Value],
        strategy: Strategy,
    ) -> ReflectResult<Selection> {
        let candidates = self.lookup.public_constructors(ty)?;

        let selection = match strategy {
            Strategy::Explicit => self.explicit(&candidates, args),
            Strategy::Heuristic => self.heuristic(&candidates, args),
            Strategy::Auto if args.iter().any(Value::is_proxy) => {
                self.heuristic(&candidates, args)
            }
            Strategy::Auto => self
                .explicit(&candidates, args)
                .or_else(|| self.heuristic(&candidates, args)),
        };

        match selection {
            Some(selection) => {
                tracing::debug!(
                    type_name = ty.name(),
                    ?strategy,
                    constructor = selection.constructor.index(),
                    order = ?selection.order,
                    "constructor selected"
                );
                Ok(selection)
            }
            None => {
                let labels: Vec<String> = args.iter().map(Value::type_label).collect();
                tracing::debug!(type_name = ty.name(), ?strategy, args = ?labels, "no constructor matched");
                Err(ReflectError::member_not_found(
                    ty.name(),
                    format!("<init>({})", labels.join(", ")),
                ))
            }
        }
    }

    fn explicit(&self, candidates: &[ConstructorHandle], args: &[Value]) -> Option<Selection> {
        let runtime: Vec<TypeId> = args
            .iter()
            .map(|arg| self.registry.runtime_type(arg))
            .collect::<Option<_>>()?;

        candidates
            .iter()
            .find(|ctor| ctor.params() == runtime.as_slice())
            .map(|ctor| Selection {
                constructor: ctor.clone(),
                order: (0..args.len()).collect(),
            })
    }

    fn heuristic(&self, candidates: &[ConstructorHandle], args: &[Value]) -> Option<Selection> {
        let arity: Vec<&ConstructorHandle> = candidates
            .iter()
            .filter(|ctor| ctor.params().len() == args.len())
            .collect();

        let positional = arity.iter().find(|ctor| {
            ctor.params()
                .iter()
                .zip(args)
                .all(|(&param, arg)| self.registry.accepts(param, arg))
        });
        if let Some(ctor) = positional {
            return Some(Selection {
                constructor: (*ctor).clone(),
                order: (0..args.len()).collect(),
            });
        }

        arity.into_iter().find_map(|ctor| {
            self.pair(ctor.params(), args).map(|order| Selection {
                constructor: ctor.clone(),
                order,
            })
        })
    }

    /// Bijective pairing of parameters to arguments, or `None`.
    ///
    /// Each parameter takes the leftmost unclaimed compatible argument;
    /// only when none is left does it re-route earlier claims along an
    /// augmenting path (Kuhn's matching). The result is deterministic when
    /// several arguments share a type.
    fn pair(&self, params: &[TypeId], args: &[Value]) -> Option<Vec<usize>> {
        let compatible: Vec<Vec<bool>> = params
            .iter()
            .map(|&param| args.iter().map(|arg| self.registry.accepts(param, arg)).collect())
            .collect();

        let mut owner: Vec<Option<usize>> = vec![None; args.len()];
        for param in 0..params.len() {
            let unclaimed = (0..args.len()).find(|&arg| compatible[param][arg] && owner[arg].is_none());
            if let Some(arg) = unclaimed {
                owner[arg] = Some(param);
                continue;
            }
            let mut visited = vec![false; args.len()];
            if !augment(param, &compatible, &mut owner, &mut visited) {
                return None;
            }
        }

        let mut order = vec![0; params.len()];
        for (arg, param) in owner.iter().enumerate() {
            if let Some(param) = param {
                order[*param] = arg;
            }
        }
        Some(order)
    }
}

fn augment(
    param: usize,
    compatible: &[Vec<bool>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for arg in 0..owner.len() {
        if !compatible[param][arg] || visited[arg] {
            continue;
        }
        visited[arg] = true;
        let free = match owner[arg] {
            None => true,
            Some(other) => augment(other, compatible, owner, visited),
        };
        if free {
            owner[arg] = Some(param);
            return true;
        }
    }
    false
}
