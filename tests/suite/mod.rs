mod concurrency;
mod lookup;
mod roots;
