//! ## Background
//!
//! A time series query is compiled into a plan of operators: read a bucket, restrict it to a time
//! range, filter rows, group series, window them and aggregate each window. Executed naively, the
//! storage engine streams every point in range to the query engine, which then throws most of
//! them away. The storage engine can do much of this work itself, close to the data: it evaluates
//! tag and field predicates, groups series, aggregates windows and lists tag keys and values.
//!
//! This crate rewrites a logical query plan so that as much work as possible is pushed down into
//! storage reads.
//!
//! ## Design
//!
//! ### Heuristic Optimizer
//!
//! Pushdown is rule based. Each rule recognizes a chain of logical operators sitting on top of a
//! storage read and replaces it with a more capable read. The [`heuristic::HepOptimizer`] runs a
//! batch of rules iteratively, until reaching fix point or maximum number of iteration times.
//! A rule either rewrites the subgraph it matched or leaves it alone; it only returns an error
//! when the query can not be executed at all, e.g. it reads a bucket that does not exist.
//!
//! ### Storage predicates
//!
//! Filter functions are written against rows (`(r) => r._measurement == "cpu"`), storage
//! evaluates predicates over series keys and field values. [`storage::to_storage_predicate`]
//! translates the former into the latter, [`storage::Predicate`] serializes into the wire shape
//! of the storage read request.
//!
//! ## Example
//!
//! ```
//! use storage_pushdown::heuristic::HepOptimizer;
//! use storage_pushdown::operator::{Aggregate, AggregateMethod, Range, Window};
//! use storage_pushdown::optimizer::{Optimizer, OptimizerContext};
//! use storage_pushdown::plan::LogicalPlanBuilder;
//! use storage_pushdown::time::{Bounds, Duration};
//!
//! let plan = LogicalPlanBuilder::new()
//!     .from_bucket_id("000000000000beef")
//!     .range(Range::absolute(Bounds::from_nanos(0, 3_600_000_000_000).unwrap()))
//!     .window(Window::new(Duration::from_secs(60)))
//!     .aggregate(Aggregate::on_value(AggregateMethod::Max))
//!     .build();
//!
//! let optimized = HepOptimizer::with_default_rules(plan, OptimizerContext::default())
//!     .find_best_plan()
//!     .unwrap();
//! assert_eq!(1, optimized.bfs_iterator().count());
//! println!("{}", optimized);
//! ```

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

pub mod error;
pub mod heuristic;
pub mod operator;
pub mod optimizer;
pub mod plan;
pub mod rules;
pub mod semantic;
pub mod storage;
pub mod time;
