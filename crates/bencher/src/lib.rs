/// One benchmark input: a query string, a cookie header or a request path.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: &'static str,
}

impl TestCase {
    pub const fn new(name: &'static str, group: TestGroup, input: &'static str) -> Self {
        Self { name, group, input }
    }

    pub const fn small(name: &'static str, input: &'static str) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub const fn normal(name: &'static str, input: &'static str) -> Self {
        Self::new(name, TestGroup::Normal, input)
    }

    pub const fn large(name: &'static str, input: &'static str) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &'static str {
        self.input
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    /// Criterion sample size; large inputs take fewer samples.
    pub fn sample_size(self) -> usize {
        match self {
            TestGroup::Small | TestGroup::Normal => 100,
            TestGroup::Large => 50,
        }
    }
}
