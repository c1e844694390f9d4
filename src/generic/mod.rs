/*!
Generic structures, abstracted from their use in the library.
*/

pub mod combinations;
