//! Properties of the search and quantile building blocks, and of the intervals
//! assembled from them.

mod intervals;
