mod fakes;
mod missing;
