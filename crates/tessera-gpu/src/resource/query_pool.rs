use std::rc::Rc;

use crate::gl::{consts as gl, GlQuery};

use super::ResourceBase;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum QueryPoolType {
    /// Any sample passed, conservative.
    OcclusionConservative,
}

impl QueryPoolType {
    pub(crate) fn gl_target(self) -> u32 {
        match self {
            QueryPoolType::OcclusionConservative => gl::ANY_SAMPLES_PASSED_CONSERVATIVE,
        }
    }
}

#[derive(Debug)]
pub(crate) struct QueryPoolInner {
    pub(crate) base: ResourceBase,
    pub(crate) ty: QueryPoolType,
    pub(crate) queries: Vec<GlQuery>,
}

/// Fixed set of native queries addressed by index.
#[derive(Debug, Clone)]
pub struct QueryPool(pub(crate) Rc<QueryPoolInner>);

resource_handle!(QueryPool, destroy_query_pool);

impl QueryPool {
    pub fn query_type(&self) -> QueryPoolType {
        self.0.ty
    }

    pub fn len(&self) -> u32 {
        self.0.queries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.0.queries.is_empty()
    }

    pub(crate) fn query(&self, index: u32) -> Option<GlQuery> {
        self.0.queries.get(index as usize).copied()
    }
}
