mod interaction;
mod lifecycle;
mod sense;
mod treatment;
