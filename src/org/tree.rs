use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{Class, College, Major};
use crate::permission::{Scope, ScopeFilter, StudentPredicate};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrgTree {
    pub colleges: Vec<CollegeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollegeNode {
    #[serde(flatten)]
    pub college: College,
    pub majors: Vec<MajorNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MajorNode {
    #[serde(flatten)]
    pub major: Major,
    pub classes: Vec<Class>,
}

pub struct OrgTreeBuilder;

impl OrgTreeBuilder {
    /// Nest flat reference rows. Majors whose college is missing, and classes
    /// whose major is missing, are left out.
    pub fn build(mut colleges: Vec<College>, mut majors: Vec<Major>, mut classes: Vec<Class>) -> OrgTree {
        colleges.sort_by(|a, b| a.code.cmp(&b.code));
        majors.sort_by(|a, b| a.code.cmp(&b.code));
        classes.sort_by(class_order);

        let mut classes_by_major: HashMap<Uuid, Vec<Class>> = HashMap::new();
        for class in classes {
            classes_by_major.entry(class.major_id).or_default().push(class);
        }

        let college_ids: HashSet<Uuid> = colleges.iter().map(|c| c.id).collect();
        let mut majors_by_college: HashMap<Uuid, Vec<MajorNode>> = HashMap::new();
        let mut orphan_majors = 0usize;
        for major in majors {
            if !college_ids.contains(&major.college_id) {
                orphan_majors += 1;
                continue;
            }
            let classes = classes_by_major.remove(&major.id).unwrap_or_default();
            majors_by_college.entry(major.college_id).or_default().push(MajorNode { major, classes });
        }

        // Whatever is left belongs to majors that never made it into the tree
        let orphan_classes: usize = classes_by_major.values().map(Vec::len).sum();
        if orphan_majors > 0 || orphan_classes > 0 {
            debug!(orphan_majors, orphan_classes, "omitted orphaned org rows");
        }

        let colleges = colleges
            .into_iter()
            .map(|college| {
                let majors = majors_by_college.remove(&college.id).unwrap_or_default();
                CollegeNode { college, majors }
            })
            .collect();
        OrgTree { colleges }
    }
}

/// By class number (unnumbered last), then name
fn class_order(a: &Class, b: &Class) -> Ordering {
    match (a.class_number, b.class_number) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
}

impl OrgTree {
    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }

    pub fn find_college(&self, id: Uuid) -> Option<&College> {
        self.colleges.iter().map(|n| &n.college).find(|c| c.id == id)
    }

    pub fn find_major(&self, id: Uuid) -> Option<(&College, &MajorNode)> {
        self.colleges.iter().find_map(|node| {
            node.majors.iter().find(|m| m.major.id == id).map(|m| (&node.college, m))
        })
    }

    pub fn find_class(&self, id: Uuid) -> Option<&Class> {
        self.colleges
            .iter()
            .flat_map(|node| node.majors.iter())
            .flat_map(|m| m.classes.iter())
            .find(|c| c.id == id)
    }

    /// Majors under the given colleges, in tree order
    pub fn majors_under(&self, college_ids: &BTreeSet<Uuid>) -> Vec<&Major> {
        self.colleges
            .iter()
            .filter(|node| college_ids.contains(&node.college.id))
            .flat_map(|node| node.majors.iter().map(|m| &m.major))
            .collect()
    }

    /// The part of the tree a scope can see, using the same level precedence as `ScopeFilter`
    pub fn prune(&self, scope: &Scope) -> OrgTree {
        match ScopeFilter::narrow(scope) {
            StudentPredicate::Unrestricted => self.clone(),
            StudentPredicate::Empty => OrgTree::default(),
            StudentPredicate::ByCollege(ids) => OrgTree {
                colleges: self.colleges.iter().filter(|n| ids.contains(&n.college.id)).cloned().collect(),
            },
            StudentPredicate::ByMajor(ids) => self.retain(|major| ids.contains(&major.major.id).then(|| major.clone())),
            StudentPredicate::ByClass(ids) => self.retain(|major| {
                let classes: Vec<Class> = major.classes.iter().filter(|c| ids.contains(&c.id)).cloned().collect();
                (!classes.is_empty()).then(|| MajorNode { major: major.major.clone(), classes })
            }),
        }
    }

    /// Rebuild keeping only majors `keep` maps to a node; colleges left without majors drop out.
    fn retain(&self, keep: impl Fn(&MajorNode) -> Option<MajorNode>) -> OrgTree {
        let colleges = self
            .colleges
            .iter()
            .filter_map(|node| {
                let majors: Vec<MajorNode> = node.majors.iter().filter_map(&keep).collect();
                (!majors.is_empty()).then(|| CollegeNode { college: node.college.clone(), majors })
            })
            .collect();
        OrgTree { colleges }
    }
}
