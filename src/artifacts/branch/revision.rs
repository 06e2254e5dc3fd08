//! Revision expressions.
//!
//! A revision identifies a commit through one of:
//!
//! - a branch name (`main`, `feature/login`) or the symbolic `HEAD` (`@`)
//! - a full or abbreviated (≥ 4 hex characters) object id
//! - parent / ancestor suffixes on any of the above: `rev^`, `rev~n`
//!
//! Names take precedence over ids: an id-shaped string is only resolved
//! through the object store when no branch of that name exists. Every
//! resolution failure surfaces as [`Error::UnresolvedRef`] carrying the
//! original expression.

use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum Revision {
    /// A branch name, `HEAD`, or an id-shaped fallback
    Ref(BranchName),
    /// The first parent of a revision (`rev^`)
    Parent(Box<Revision>),
    /// The n-th first-parent ancestor of a revision (`rev~n`)
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn try_parse(revision: &str) -> Result<Revision> {
        let parent_re = regex::Regex::new(PARENT_REGEX)?;
        if let Some(caps) = parent_re.captures(revision) {
            let base = Self::try_parse(&caps[1])?;
            return Ok(Revision::Parent(Box::new(base)));
        }

        let ancestor_re = regex::Regex::new(ANCESTOR_REGEX)?;
        if let Some(caps) = ancestor_re.captures(revision) {
            let base = Self::try_parse(&caps[1])?;
            let generations: usize = caps[2]
                .parse()
                .map_err(|_| Error::UnresolvedRef(revision.to_string()))?;
            return Ok(Revision::Ancestor(Box::new(base), generations));
        }

        let name = *REF_ALIASES.get(revision).unwrap_or(&revision);
        Ok(Revision::Ref(BranchName::try_parse(name.to_string())?))
    }

    pub fn resolve(&self, repository: &Repository) -> Result<ObjectId> {
        match self {
            Revision::Ref(name) => Self::resolve_ref(name, repository),
            Revision::Parent(base) => {
                let oid = base.resolve(repository)?;
                Self::parent_of(&oid, repository)?
                    .ok_or_else(|| Error::UnresolvedRef(self.to_string()))
            }
            Revision::Ancestor(base, generations) => {
                let mut oid = base.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::parent_of(&oid, repository)?
                        .ok_or_else(|| Error::UnresolvedRef(self.to_string()))?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_ref(name: &BranchName, repository: &Repository) -> Result<ObjectId> {
        if name.is_head() {
            return repository
                .refs()
                .read_head()?
                .ok_or_else(|| Error::UnresolvedRef(name.to_string()));
        }

        if let Some(oid) = repository.refs().read_branch(name)? {
            return Ok(oid);
        }

        // No branch of that name; fall back to object-id resolution when the
        // string is id-shaped
        if Self::looks_like_oid(name.as_ref()) {
            Self::resolve_oid(name.as_ref(), repository)
        } else {
            Err(Error::UnresolvedRef(name.to_string()))
        }
    }

    fn parent_of(oid: &ObjectId, repository: &Repository) -> Result<Option<ObjectId>> {
        let commit = repository
            .database()
            .parse_object_as_commit(oid)?
            .ok_or_else(|| Error::UnresolvedRef(oid.to_string()))?;

        Ok(commit.parent().cloned())
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> Result<ObjectId> {
        if oid_str.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(oid_str.to_string())
                .map_err(|_| Error::UnresolvedRef(oid_str.to_string()))?;
            Self::require_commit(&oid, repository, oid_str)?;
            return Ok(oid);
        }

        let matches = repository.database().find_objects_by_prefix(oid_str)?;
        let commits: Vec<_> = matches
            .into_iter()
            .filter(|oid| {
                repository
                    .database()
                    .object_type_of(oid)
                    .is_ok_and(|kind| kind == ObjectType::Commit)
            })
            .collect();

        // zero or several candidates: the abbreviation does not identify one commit
        match commits.as_slice() {
            [oid] => Ok(oid.clone()),
            _ => Err(Error::UnresolvedRef(oid_str.to_string())),
        }
    }

    fn require_commit(oid: &ObjectId, repository: &Repository, rev: &str) -> Result<()> {
        let kind = repository
            .database()
            .object_type_of(oid)
            .map_err(|_| Error::UnresolvedRef(rev.to_string()))?;

        if kind != ObjectType::Commit {
            return Err(Error::UnresolvedRef(rev.to_string()));
        }

        Ok(())
    }

    fn looks_like_oid(s: &str) -> bool {
        // at least four characters of hex, at most a full id
        (4..=OBJECT_ID_LENGTH).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::Ref(name) => write!(f, "{name}"),
            Revision::Parent(base) => write!(f, "{base}^"),
            Revision::Ancestor(base, generations) => write!(f, "{base}~{generations}"),
        }
    }
}
